//! Read-side order queries.

use common::{OrderId, PharmacyId, UserId};
use domain::OrderView;
use order_store::OrderStore;

use crate::error::OrderServiceError;

/// Answers order lookups with [`OrderView`]s.
pub struct OrderQueries<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderQueries<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_orders_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderView>, OrderServiceError> {
        let orders = self.store.find_by_user_id(user_id).await?;
        Ok(orders.iter().map(OrderView::from).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_orders_by_pharmacy(
        &self,
        pharmacy_id: PharmacyId,
    ) -> Result<Vec<OrderView>, OrderServiceError> {
        let orders = self.store.find_by_pharmacy_id(pharmacy_id).await?;
        Ok(orders.iter().map(OrderView::from).collect())
    }

    /// Fails with `OrderNotFound` if the id does not resolve.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_details(
        &self,
        order_id: OrderId,
    ) -> Result<OrderView, OrderServiceError> {
        self.store
            .find_by_id(order_id)
            .await?
            .as_ref()
            .map(OrderView::from)
            .ok_or(OrderServiceError::OrderNotFound(order_id))
    }
}
