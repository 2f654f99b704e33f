//! Cart service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::{MedicineId, PharmacyId, UserId};
use serde::{Deserialize, Serialize};

use super::UpstreamError;

const SERVICE: &str = "cart";

/// One line of a user's cart, as reported by the cart service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: UserId,
    pub pharmacy_id: PharmacyId,
    pub medicine_id: MedicineId,
    pub quantity: u32,
    #[serde(default)]
    pub added_at: Option<NaiveDateTime>,
}

impl CartLine {
    pub fn new(
        user_id: UserId,
        pharmacy_id: PharmacyId,
        medicine_id: impl Into<MedicineId>,
        quantity: u32,
    ) -> Self {
        Self {
            id: None,
            user_id,
            pharmacy_id,
            medicine_id: medicine_id.into(),
            quantity,
            added_at: None,
        }
    }
}

/// Trait for cart service operations.
#[async_trait]
pub trait CartClient: Send + Sync {
    /// Returns the user's cart lines in cart order.
    ///
    /// A user without a cart yields an empty list, not an error.
    async fn get_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, UpstreamError>;

    /// Removes every line from the user's cart. Safe to repeat.
    async fn clear(&self, user_id: UserId) -> Result<(), UpstreamError>;
}

#[async_trait]
impl<T: CartClient + ?Sized> CartClient for Arc<T> {
    async fn get_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, UpstreamError> {
        (**self).get_cart(user_id).await
    }

    async fn clear(&self, user_id: UserId) -> Result<(), UpstreamError> {
        (**self).clear(user_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartLine>>,
    clear_calls: usize,
    unavailable: bool,
    fail_on_clear: bool,
}

/// In-memory cart service for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    /// Creates a new in-memory cart service with no carts.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryCartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryCartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a line to the user's cart.
    pub fn add_line(&self, line: CartLine) {
        self.write().carts.entry(line.user_id).or_default().push(line);
    }

    /// Returns the user's current cart lines.
    pub fn lines(&self, user_id: UserId) -> Vec<CartLine> {
        self.read().carts.get(&user_id).cloned().unwrap_or_default()
    }

    /// Makes every `get_cart` call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Makes every `clear` call fail with a rejected response.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.write().fail_on_clear = fail;
    }

    /// Returns the number of `clear` calls received, successful or not.
    pub fn clear_count(&self) -> usize {
        self.read().clear_calls
    }
}

#[async_trait]
impl CartClient for InMemoryCartService {
    async fn get_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, UpstreamError> {
        let state = self.read();
        if state.unavailable {
            return Err(UpstreamError::Unavailable {
                service: SERVICE,
                reason: "connection refused".to_string(),
            });
        }
        Ok(state.carts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, user_id: UserId) -> Result<(), UpstreamError> {
        let mut state = self.write();
        state.clear_calls += 1;

        if state.fail_on_clear {
            return Err(UpstreamError::Rejected {
                service: SERVICE,
                status: 500,
                message: "Failed to clear cart".to_string(),
            });
        }

        state.carts.remove(&user_id);
        Ok(())
    }
}
