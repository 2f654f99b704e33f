//! Order placement coordinator.

use std::time::Instant;

use common::{Money, OrderId, UserId};
use domain::{NewOrder, NewOrderItem, Order, OrderItem};
use order_store::{OrderItemStore, OrderStore};

use crate::error::PlacementError;
use crate::saga::{
    Compensation, CompletedStep, PlacementSaga, STEP_CLEAR_CART, STEP_CREATE_ORDER,
    STEP_FETCH_CART, STEP_FINALIZE_ORDER, STEP_RESERVE_LINE,
};
use crate::services::{CartClient, CartLine, MedicineClient};

/// What the coordinator does with completed steps when placement fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompensationMode {
    /// Unwind completed steps in reverse order.
    #[default]
    Compensate,
    /// Leave partial rows and decremented stock in place.
    None,
}

impl CompensationMode {
    /// `true` selects `Compensate`, `false` selects `None`.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            CompensationMode::Compensate
        } else {
            CompensationMode::None
        }
    }
}

/// Turns a user's cart into a placed order.
///
/// The cart, medicine and order storage services share no transaction. Each
/// side effect is recorded in a [`PlacementSaga`] so that, in
/// [`CompensationMode::Compensate`], a failure can be unwound.
pub struct OrderPlacementCoordinator<S, C, M>
where
    S: OrderStore + OrderItemStore,
    C: CartClient,
    M: MedicineClient,
{
    store: S,
    cart: C,
    medicine: M,
    mode: CompensationMode,
}

impl<S, C, M> OrderPlacementCoordinator<S, C, M>
where
    S: OrderStore + OrderItemStore,
    C: CartClient,
    M: MedicineClient,
{
    /// Creates a coordinator with compensation enabled.
    pub fn new(store: S, cart: C, medicine: M) -> Self {
        Self {
            store,
            cart,
            medicine,
            mode: CompensationMode::default(),
        }
    }

    pub fn with_compensation(mut self, mode: CompensationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Places an order from the user's current cart.
    ///
    /// Lines are processed one at a time in cart order. On success the
    /// returned order is `Placed` and the cart has been cleared.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Order, PlacementError> {
        metrics::counter!("order_placements_total").increment(1);
        let started = Instant::now();

        let mut saga = PlacementSaga::start(user_id);
        let result = self.run(&mut saga).await;

        let failure = match &result {
            Ok(order) => {
                saga.complete();
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_amount,
                    items = order.items.len(),
                    "order placed"
                );
                None
            }
            Err(err) => {
                metrics::counter!("order_placements_failed", "reason" => err.reason())
                    .increment(1);
                tracing::warn!(error = %err, reason = err.reason(), "order placement failed");
                Some(err.to_string())
            }
        };

        if let Some(reason) = failure {
            if self.mode == CompensationMode::Compensate && !saga.completed_steps().is_empty() {
                self.compensate(&mut saga, &reason).await;
            }
            saga.fail(reason);
        }

        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn run(&self, saga: &mut PlacementSaga) -> Result<Order, PlacementError> {
        let user_id = saga.user_id();

        tracing::info!(step = STEP_FETCH_CART, "placement step started");
        let lines = self
            .cart
            .get_cart(user_id)
            .await
            .map_err(PlacementError::CartServiceUnavailable)?;

        let Some(first) = lines.first() else {
            return Err(PlacementError::CartEmpty(user_id));
        };
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(PlacementError::InvalidQuantity {
                medicine_id: line.medicine_id.clone(),
                quantity: line.quantity,
            });
        }

        let pharmacy_id = first.pharmacy_id;
        if lines.iter().any(|line| line.pharmacy_id != pharmacy_id) {
            tracing::warn!(
                %pharmacy_id,
                "cart lines name more than one pharmacy; using the first line's"
            );
        }

        tracing::info!(step = STEP_CREATE_ORDER, %pharmacy_id, "placement step started");
        let mut order = self
            .store
            .create(NewOrder::now(user_id, pharmacy_id))
            .await?;
        saga.record(CompletedStep::OrderCreated(order.id));

        let mut total = Money::zero();
        for line in &lines {
            tracing::info!(
                step = STEP_RESERVE_LINE,
                order_id = %order.id,
                medicine_id = %line.medicine_id,
                quantity = line.quantity,
                "placement step started"
            );
            let item = self.reserve_line(saga, order.id, line).await?;
            total = total
                .checked_add(item.total_price)
                .ok_or_else(|| PlacementError::AmountOverflow(line.medicine_id.clone()))?;
            order.attach_item(item);
        }

        tracing::info!(step = STEP_FINALIZE_ORDER, order_id = %order.id, %total, "placement step started");
        order.place(total)?;
        let order = self.store.save(&order).await?;

        tracing::info!(step = STEP_CLEAR_CART, order_id = %order.id, "placement step started");
        self.cart
            .clear(user_id)
            .await
            .map_err(PlacementError::CartClearFailed)?;

        Ok(order)
    }

    /// Checks stock for one cart line, saves its item and takes the stock.
    async fn reserve_line(
        &self,
        saga: &mut PlacementSaga,
        order_id: OrderId,
        line: &CartLine,
    ) -> Result<OrderItem, PlacementError> {
        let snapshot = self
            .medicine
            .get_snapshot(&line.medicine_id)
            .await
            .map_err(PlacementError::MedicineServiceUnavailable)?
            .ok_or_else(|| PlacementError::MedicineNotFound(line.medicine_id.clone()))?;

        // Advisory only; reduce_stock is the authoritative check.
        if snapshot.available_quantity < line.quantity {
            return Err(PlacementError::OutOfStock {
                medicine_id: line.medicine_id.clone(),
                name: snapshot.name,
                requested: line.quantity,
                available: snapshot.available_quantity,
            });
        }

        if snapshot.price.checked_multiply(line.quantity).is_none() {
            return Err(PlacementError::AmountOverflow(line.medicine_id.clone()));
        }

        let item = self
            .store
            .save_item(NewOrderItem {
                order_id,
                medicine_id: line.medicine_id.clone(),
                quantity: line.quantity,
                price_per_unit: snapshot.price,
            })
            .await?;
        saga.record(CompletedStep::ItemSaved {
            order_id,
            item_id: item.id,
        });

        if let Err(source) = self
            .medicine
            .reduce_stock(&line.medicine_id, line.quantity)
            .await
        {
            // A lost reply may hide an applied decrement.
            if source.outcome_unknown() {
                saga.record(CompletedStep::StockUnconfirmed {
                    order_id,
                    medicine_id: line.medicine_id.clone(),
                    quantity: line.quantity,
                });
            }
            return Err(PlacementError::StockReductionFailed {
                medicine_id: line.medicine_id.clone(),
                source,
            });
        }
        saga.record(CompletedStep::StockReduced {
            medicine_id: line.medicine_id.clone(),
            quantity: line.quantity,
        });

        Ok(item)
    }

    /// Runs compensations in reverse order of completed steps.
    ///
    /// A failing compensation is logged and counted; the remaining ones
    /// still run.
    #[tracing::instrument(skip(self, saga), fields(user_id = %saga.user_id(), order_id = ?saga.order_id()))]
    async fn compensate(&self, saga: &mut PlacementSaga, reason: &str) {
        metrics::counter!("order_compensations_total").increment(1);

        for compensation in saga.begin_compensation(reason) {
            let result = match &compensation {
                Compensation::RestoreStock {
                    medicine_id,
                    quantity,
                } => self
                    .medicine
                    .restore_stock(medicine_id, *quantity)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Compensation::DeleteItems(order_id) => self
                    .store
                    .delete_items_by_order_id(*order_id)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Compensation::DeleteOrder(order_id) => self
                    .store
                    .delete(*order_id)
                    .await
                    .map_err(|e| e.to_string()),
                Compensation::Reconcile {
                    order_id,
                    medicine_id,
                    quantity,
                } => {
                    metrics::counter!("order_stock_unconfirmed_total").increment(1);
                    tracing::error!(
                        %order_id,
                        %medicine_id,
                        quantity,
                        "stock reduction outcome unknown, order kept for reconciliation"
                    );
                    Ok(())
                }
            };

            match result {
                Ok(()) => {
                    tracing::debug!(compensation = compensation.name(), "compensation step completed");
                }
                Err(error) => {
                    saga.record_compensation_failure();
                    metrics::counter!("order_compensation_steps_failed").increment(1);
                    tracing::error!(
                        compensation = compensation.name(),
                        %error,
                        "compensation step failed"
                    );
                }
            }
        }

        tracing::info!(
            failures = saga.compensation_failures(),
            reason = saga.failure_reason().unwrap_or_default(),
            "compensation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryCartService, InMemoryMedicineService, UpstreamError};
    use crate::state::SagaState;
    use common::{MedicineId, PharmacyId};
    use domain::OrderStatus;
    use order_store::InMemoryOrderStore;

    type TestCoordinator =
        OrderPlacementCoordinator<InMemoryOrderStore, InMemoryCartService, InMemoryMedicineService>;

    fn setup() -> (
        TestCoordinator,
        InMemoryOrderStore,
        InMemoryCartService,
        InMemoryMedicineService,
    ) {
        let store = InMemoryOrderStore::new();
        let cart = InMemoryCartService::new();
        let medicine = InMemoryMedicineService::new();
        medicine.stock("M1", "Paracetamol", Money::from_cents(1000), 10);
        medicine.stock("M2", "Ibuprofen", Money::from_cents(500), 10);

        let coordinator =
            OrderPlacementCoordinator::new(store.clone(), cart.clone(), medicine.clone());
        (coordinator, store, cart, medicine)
    }

    fn add(cart: &InMemoryCartService, medicine: &str, quantity: u32) {
        cart.add_line(CartLine::new(
            UserId::new(1),
            PharmacyId::new(7),
            medicine,
            quantity,
        ));
    }

    #[tokio::test]
    async fn test_place_order_happy_path() {
        let (coordinator, _store, cart, medicine) = setup();
        add(&cart, "M1", 2);
        add(&cart, "M2", 1);

        let order = coordinator.place_order(UserId::new(1)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.total_amount.cents(), 2500);
        assert_eq!(order.pharmacy_id, PharmacyId::new(7));
        assert_eq!(order.items.len(), 2);
        assert_eq!(medicine.available(&MedicineId::new("M1")), Some(8));
        assert!(cart.lines(UserId::new(1)).is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_line_is_rejected_before_any_write() {
        let (coordinator, store, cart, medicine) = setup();
        add(&cart, "M1", 0);

        let result = coordinator.place_order(UserId::new(1)).await;

        assert!(matches!(
            result,
            Err(PlacementError::InvalidQuantity { quantity: 0, .. })
        ));
        assert_eq!(store.order_count().await, 0);
        assert!(medicine.stock_calls().is_empty());
    }

    #[tokio::test]
    async fn test_compensation_restores_earlier_lines() {
        let (coordinator, store, cart, medicine) = setup();
        add(&cart, "M1", 2);
        add(&cart, "M2", 1);
        medicine.fail_reduce_for("M2");

        let result = coordinator.place_order(UserId::new(1)).await;

        assert!(matches!(
            result,
            Err(PlacementError::StockReductionFailed {
                source: UpstreamError::Rejected { .. },
                ..
            })
        ));
        assert_eq!(medicine.available(&MedicineId::new("M1")), Some(10));
        assert_eq!(medicine.restorations(), vec![(MedicineId::new("M1"), 2)]);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_no_compensation_leaves_pending_rows() {
        let (coordinator, store, cart, medicine) = setup();
        let coordinator = coordinator.with_compensation(CompensationMode::None);
        add(&cart, "M1", 2);
        add(&cart, "M2", 1);
        medicine.fail_reduce_for("M2");

        assert!(coordinator.place_order(UserId::new(1)).await.is_err());

        let orders = store.find_by_user_id(UserId::new(1)).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].items.len(), 2);
        assert_eq!(medicine.available(&MedicineId::new("M1")), Some(8));
        assert!(medicine.restorations().is_empty());
    }

    #[tokio::test]
    async fn test_lost_reduce_reply_keeps_order_for_reconciliation() {
        let (coordinator, store, cart, medicine) = setup();
        add(&cart, "M2", 1);
        add(&cart, "M1", 4);
        medicine.drop_reduce_reply_for("M1");

        let result = coordinator.place_order(UserId::new(1)).await;

        assert!(matches!(
            result,
            Err(PlacementError::StockReductionFailed {
                source: UpstreamError::Unavailable { .. },
                ..
            })
        ));
        // The confirmed line is given back, the ambiguous one is not.
        assert_eq!(medicine.restorations(), vec![(MedicineId::new("M2"), 1)]);
        assert_eq!(medicine.available(&MedicineId::new("M2")), Some(10));
        assert_eq!(medicine.available(&MedicineId::new("M1")), Some(6));

        let orders = store.find_by_user_id(UserId::new(1)).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        let lines: Vec<_> = orders[0]
            .items
            .iter()
            .map(|i| (i.medicine_id.as_str(), i.quantity))
            .collect();
        assert_eq!(lines, vec![("M2", 1), ("M1", 4)]);
        assert_eq!(cart.lines(UserId::new(1)).len(), 2);
    }

    #[tokio::test]
    async fn test_line_price_overflow_is_rejected_before_saving_item() {
        let (coordinator, store, cart, medicine) = setup();
        medicine.stock("M9", "Orphan drug", Money::from_cents(i64::MAX / 2 + 1), 10);
        add(&cart, "M9", 2);

        let result = coordinator.place_order(UserId::new(1)).await;

        assert!(matches!(result, Err(PlacementError::AmountOverflow(ref id)) if id.as_str() == "M9"));
        assert!(medicine.stock_calls().is_empty());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_order_total_overflow_unwinds_every_line() {
        let (coordinator, store, cart, medicine) = setup();
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        medicine.stock("M9", "Orphan drug", huge, 10);
        medicine.stock("M10", "Orphan drug XR", huge, 10);
        add(&cart, "M9", 1);
        add(&cart, "M10", 1);

        let result = coordinator.place_order(UserId::new(1)).await;

        assert!(matches!(result, Err(PlacementError::AmountOverflow(ref id)) if id.as_str() == "M10"));
        assert_eq!(
            medicine.restorations(),
            vec![(MedicineId::new("M10"), 1), (MedicineId::new("M9"), 1)]
        );
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_saga_tracks_steps() {
        let (coordinator, _store, cart, _medicine) = setup();
        add(&cart, "M1", 1);

        let mut saga = PlacementSaga::start(UserId::new(1));
        coordinator.run(&mut saga).await.unwrap();

        assert_eq!(saga.state(), SagaState::Running);
        let names: Vec<_> = saga.completed_steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["order_created", "item_saved", "stock_reduced"]);
    }

    #[test]
    fn test_compensation_mode_from_flag() {
        assert_eq!(CompensationMode::default(), CompensationMode::Compensate);
        assert_eq!(CompensationMode::from_enabled(true), CompensationMode::Compensate);
        assert_eq!(CompensationMode::from_enabled(false), CompensationMode::None);
    }
}
