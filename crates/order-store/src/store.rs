use async_trait::async_trait;
use common::{OrderId, PharmacyId, UserId};
use domain::{NewOrder, NewOrderItem, Order, OrderItem};

use crate::Result;

/// Persistence for order headers.
///
/// Orders returned by lookups are hydrated with their items in the order
/// they were saved. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order shell and assigns its identifier.
    ///
    /// The returned order is `Pending`, has a zero total and no items.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Persists the mutable header fields of an existing order (total and
    /// status). Items are not touched; they are written through
    /// [`OrderItemStore::save_item`].
    ///
    /// Fails with `NotFound` if the order does not exist.
    async fn save(&self, order: &Order) -> Result<Order>;

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, oldest first.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Lists a pharmacy's orders, oldest first.
    async fn find_by_pharmacy_id(&self, pharmacy_id: PharmacyId) -> Result<Vec<Order>>;

    /// Removes an order and all of its items.
    ///
    /// Deleting a missing order is a no-op.
    async fn delete(&self, order_id: OrderId) -> Result<()>;
}

/// Persistence for order items. Items are append-only.
#[async_trait]
pub trait OrderItemStore: Send + Sync {
    /// Persists a new item and assigns its identifier.
    async fn save_item(&self, item: NewOrderItem) -> Result<OrderItem>;

    /// Lists the items of an order in the order they were saved.
    async fn find_items_by_order_id(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Removes every item of an order, returning how many were removed.
    async fn delete_items_by_order_id(&self, order_id: OrderId) -> Result<u64>;
}
