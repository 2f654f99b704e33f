//! Role-gated order status updates.

use common::{OrderId, PharmacyId, UserId};
use domain::{Actor, Order, OrderStatus};
use order_store::OrderStore;

use crate::error::OrderServiceError;

/// Applies status changes requested by users and pharmacies.
///
/// Updates are read-modify-write against the store; concurrent updates to
/// the same order are last-write-wins. Ownership of the order is not checked.
pub struct OrderLifecycle<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// A user may cancel a placed order or mark any order delivered.
    #[tracing::instrument(skip(self))]
    pub async fn update_status_by_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        self.transition(Actor::User(user_id), order_id, requested)
            .await
    }

    /// A pharmacy may dispatch a placed order.
    #[tracing::instrument(skip(self))]
    pub async fn update_status_by_pharmacy(
        &self,
        pharmacy_id: PharmacyId,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        self.transition(Actor::Pharmacy(pharmacy_id), order_id, requested)
            .await
    }

    async fn transition(
        &self,
        actor: Actor,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        let mut order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(order_id))?;

        let previous = order.request_status(&actor, requested).inspect_err(|err| {
            tracing::warn!(actor = actor.role(), error = %err, "status change rejected");
        })?;
        let saved = self.store.save(&order).await?;

        metrics::counter!(
            "order_status_transitions_total",
            "actor" => actor.role(),
            "status" => saved.status.as_str()
        )
        .increment(1);
        tracing::info!(
            actor = actor.role(),
            from = %previous,
            to = %saved.status,
            "order status changed"
        );

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MedicineId, Money};
    use domain::{NewOrder, NewOrderItem, OrderError};
    use order_store::{InMemoryOrderStore, OrderItemStore};

    async fn placed_order(store: &InMemoryOrderStore) -> Order {
        let mut order = store
            .create(NewOrder::now(UserId::new(1), PharmacyId::new(2)))
            .await
            .unwrap();
        let item = store
            .save_item(NewOrderItem {
                order_id: order.id,
                medicine_id: MedicineId::new("M1"),
                quantity: 1,
                price_per_unit: Money::from_cents(100),
            })
            .await
            .unwrap();
        order.attach_item(item);
        order.place(Money::from_cents(100)).unwrap();
        store.save(&order).await.unwrap()
    }

    #[tokio::test]
    async fn test_user_cancel_then_cancel_again() {
        let store = InMemoryOrderStore::new();
        let order = placed_order(&store).await;
        let lifecycle = OrderLifecycle::new(store.clone());

        let cancelled = lifecycle
            .update_status_by_user(order.user_id, order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let result = lifecycle
            .update_status_by_user(order.user_id, order.id, OrderStatus::Cancelled)
            .await;
        assert!(matches!(
            result,
            Err(OrderServiceError::Transition(
                OrderError::AlreadyOutForDelivery { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_pharmacy_dispatch_persists() {
        let store = InMemoryOrderStore::new();
        let order = placed_order(&store).await;
        let lifecycle = OrderLifecycle::new(store.clone());

        lifecycle
            .update_status_by_pharmacy(order.pharmacy_id, order.id, OrderStatus::OutForDelivery)
            .await
            .unwrap();

        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::OutForDelivery);
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_transition_is_not_saved() {
        let store = InMemoryOrderStore::new();
        let order = placed_order(&store).await;
        let lifecycle = OrderLifecycle::new(store.clone());

        let result = lifecycle
            .update_status_by_pharmacy(order.pharmacy_id, order.id, OrderStatus::Delivered)
            .await;
        assert!(matches!(
            result,
            Err(OrderServiceError::Transition(
                OrderError::UnauthorizedTransition { .. }
            ))
        ));

        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Placed);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let lifecycle = OrderLifecycle::new(InMemoryOrderStore::new());
        let missing = OrderId::new();

        let result = lifecycle
            .update_status_by_user(UserId::new(1), missing, OrderStatus::Delivered)
            .await;
        assert!(matches!(result, Err(OrderServiceError::OrderNotFound(id)) if id == missing));
    }
}
