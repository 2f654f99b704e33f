//! Medicine service trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::{MedicineId, Money};

use super::UpstreamError;

const SERVICE: &str = "medicine";

/// Point-in-time view of a medicine. Never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicineSnapshot {
    pub medicine_id: MedicineId,
    pub name: String,
    pub price: Money,
    pub available_quantity: u32,
}

/// Trait for medicine service operations.
#[async_trait]
pub trait MedicineClient: Send + Sync {
    /// Reads the current snapshot of a medicine. Returns None if unknown.
    async fn get_snapshot(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Option<MedicineSnapshot>, UpstreamError>;

    /// Decrements stock by `quantity` only if that much is still available.
    ///
    /// This is the authoritative stock check; callers' own reads are advisory.
    async fn reduce_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError>;

    /// Gives back `quantity` units previously taken by `reduce_stock`.
    async fn restore_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError>;
}

#[async_trait]
impl<T: MedicineClient + ?Sized> MedicineClient for Arc<T> {
    async fn get_snapshot(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Option<MedicineSnapshot>, UpstreamError> {
        (**self).get_snapshot(medicine_id).await
    }

    async fn reduce_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        (**self).reduce_stock(medicine_id, quantity).await
    }

    async fn restore_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        (**self).restore_stock(medicine_id, quantity).await
    }
}

/// A stock-changing call received by [`InMemoryMedicineService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockCall {
    Reduce { medicine_id: MedicineId, quantity: u32 },
    Restore { medicine_id: MedicineId, quantity: u32 },
}

#[derive(Debug, Default)]
struct InMemoryMedicineState {
    catalog: HashMap<MedicineId, MedicineSnapshot>,
    calls: Vec<StockCall>,
    unavailable: bool,
    fail_reduce_for: HashSet<MedicineId>,
    drop_reduce_reply_for: HashSet<MedicineId>,
    fail_on_restore: bool,
}

/// In-memory medicine service for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMedicineService {
    state: Arc<RwLock<InMemoryMedicineState>>,
}

impl InMemoryMedicineService {
    /// Creates a new in-memory medicine service with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryMedicineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryMedicineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a medicine in the catalog.
    pub fn stock(
        &self,
        medicine_id: impl Into<MedicineId>,
        name: impl Into<String>,
        price: Money,
        available_quantity: u32,
    ) {
        let medicine_id = medicine_id.into();
        self.write().catalog.insert(
            medicine_id.clone(),
            MedicineSnapshot {
                medicine_id,
                name: name.into(),
                price,
                available_quantity,
            },
        );
    }

    /// Returns the current available quantity of a medicine.
    pub fn available(&self, medicine_id: &MedicineId) -> Option<u32> {
        self.read()
            .catalog
            .get(medicine_id)
            .map(|m| m.available_quantity)
    }

    /// Makes every `get_snapshot` call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Makes `reduce_stock` for this medicine fail with a rejected response.
    pub fn fail_reduce_for(&self, medicine_id: impl Into<MedicineId>) {
        self.write().fail_reduce_for.insert(medicine_id.into());
    }

    /// Makes `reduce_stock` for this medicine apply the decrement and then
    /// report a timeout, as when the reply is lost in transit.
    pub fn drop_reduce_reply_for(&self, medicine_id: impl Into<MedicineId>) {
        self.write().drop_reduce_reply_for.insert(medicine_id.into());
    }

    /// Makes every `restore_stock` call fail.
    pub fn set_fail_on_restore(&self, fail: bool) {
        self.write().fail_on_restore = fail;
    }

    /// Returns every stock-changing call received, in order.
    pub fn stock_calls(&self) -> Vec<StockCall> {
        self.read().calls.clone()
    }

    /// Returns the `(medicine, quantity)` pairs of every reduce call.
    pub fn reductions(&self) -> Vec<(MedicineId, u32)> {
        self.read()
            .calls
            .iter()
            .filter_map(|call| match call {
                StockCall::Reduce {
                    medicine_id,
                    quantity,
                } => Some((medicine_id.clone(), *quantity)),
                StockCall::Restore { .. } => None,
            })
            .collect()
    }

    /// Returns the `(medicine, quantity)` pairs of every restore call.
    pub fn restorations(&self) -> Vec<(MedicineId, u32)> {
        self.read()
            .calls
            .iter()
            .filter_map(|call| match call {
                StockCall::Restore {
                    medicine_id,
                    quantity,
                } => Some((medicine_id.clone(), *quantity)),
                StockCall::Reduce { .. } => None,
            })
            .collect()
    }
}

fn not_found(medicine_id: &MedicineId) -> UpstreamError {
    UpstreamError::Rejected {
        service: SERVICE,
        status: 404,
        message: format!("Medicine not found with id: {medicine_id}"),
    }
}

#[async_trait]
impl MedicineClient for InMemoryMedicineService {
    async fn get_snapshot(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Option<MedicineSnapshot>, UpstreamError> {
        let state = self.read();
        if state.unavailable {
            return Err(UpstreamError::Unavailable {
                service: SERVICE,
                reason: "connection refused".to_string(),
            });
        }
        Ok(state.catalog.get(medicine_id).cloned())
    }

    async fn reduce_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        let mut state = self.write();
        state.calls.push(StockCall::Reduce {
            medicine_id: medicine_id.clone(),
            quantity,
        });

        if state.fail_reduce_for.contains(medicine_id) {
            return Err(UpstreamError::Rejected {
                service: SERVICE,
                status: 500,
                message: "Failed to reduce medicine stock".to_string(),
            });
        }

        let medicine = state
            .catalog
            .get_mut(medicine_id)
            .ok_or_else(|| not_found(medicine_id))?;

        if medicine.available_quantity < quantity {
            return Err(UpstreamError::Rejected {
                service: SERVICE,
                status: 409,
                message: format!(
                    "Insufficient stock for {}: requested {quantity}, available {}",
                    medicine.name, medicine.available_quantity
                ),
            });
        }

        medicine.available_quantity -= quantity;
        let updated = medicine.clone();

        if state.drop_reduce_reply_for.contains(medicine_id) {
            return Err(UpstreamError::Unavailable {
                service: SERVICE,
                reason: "operation timed out".to_string(),
            });
        }
        Ok(updated)
    }

    async fn restore_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        let mut state = self.write();
        state.calls.push(StockCall::Restore {
            medicine_id: medicine_id.clone(),
            quantity,
        });

        if state.fail_on_restore {
            return Err(UpstreamError::Unavailable {
                service: SERVICE,
                reason: "connection reset".to_string(),
            });
        }

        let medicine = state
            .catalog
            .get_mut(medicine_id)
            .ok_or_else(|| not_found(medicine_id))?;
        medicine.available_quantity += quantity;
        Ok(medicine.clone())
    }
}
