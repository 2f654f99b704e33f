use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, OrderItemId, PharmacyId, UserId};
use domain::{NewOrder, NewOrderItem, Order, OrderItem};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{OrderItemStore, OrderStore},
};

#[derive(Debug, Default)]
struct Tables {
    /// Order headers in creation order; `items` is always empty here.
    orders: Vec<Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
}

impl Tables {
    fn hydrate(&self, header: &Order) -> Order {
        let mut order = header.clone();
        order.items = self.items.get(&header.id).cloned().unwrap_or_default();
        order
    }
}

/// In-memory order store implementation for testing and local runs.
///
/// This implementation keeps all rows in memory and provides the same
/// interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the total number of order items stored.
    pub async fn item_count(&self) -> usize {
        self.tables.read().await.items.values().map(Vec::len).sum()
    }

    async fn find_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        let tables = self.tables.read().await;
        tables
            .orders
            .iter()
            .filter(|o| predicate(o))
            .map(|o| tables.hydrate(o))
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let order = Order::from_new(OrderId::new(), order);
        self.tables.write().await.orders.push(order.clone());
        Ok(order)
    }

    async fn save(&self, order: &Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let header = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(StoreError::NotFound(order.id))?;

        header.total_amount = order.total_amount;
        header.status = order.status;
        let header = header.clone();

        Ok(tables.hydrate(&header))
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.find_where(|o| o.id == order_id).await.into_iter().next())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.find_where(|o| o.user_id == user_id).await)
    }

    async fn find_by_pharmacy_id(&self, pharmacy_id: PharmacyId) -> Result<Vec<Order>> {
        Ok(self.find_where(|o| o.pharmacy_id == pharmacy_id).await)
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.orders.retain(|o| o.id != order_id);
        tables.items.remove(&order_id);
        Ok(())
    }
}

#[async_trait]
impl OrderItemStore for InMemoryOrderStore {
    async fn save_item(&self, item: NewOrderItem) -> Result<OrderItem> {
        let mut tables = self.tables.write().await;
        if !tables.orders.iter().any(|o| o.id == item.order_id) {
            return Err(StoreError::NotFound(item.order_id));
        }

        let item = OrderItem::from_new(OrderItemId::new(), item);
        tables
            .items
            .entry(item.order_id)
            .or_default()
            .push(item.clone());
        Ok(item)
    }

    async fn find_items_by_order_id(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let tables = self.tables.read().await;
        Ok(tables.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn delete_items_by_order_id(&self, order_id: OrderId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let removed = tables.items.remove(&order_id).map_or(0, |items| items.len());
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use common::{MedicineId, Money};
    use domain::OrderStatus;

    use super::*;

    fn new_order(user: i64, pharmacy: i64) -> NewOrder {
        NewOrder::now(UserId::new(user), PharmacyId::new(pharmacy))
    }

    fn new_item(order_id: OrderId, medicine: &str, quantity: u32, cents: i64) -> NewOrderItem {
        NewOrderItem {
            order_id,
            medicine_id: MedicineId::new(medicine),
            quantity,
            price_per_unit: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_pending_status() {
        let store = InMemoryOrderStore::new();
        let a = store.create(new_order(1, 10)).await.unwrap();
        let b = store.create(new_order(1, 10)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.status, OrderStatus::Pending);
        assert!(a.total_amount.is_zero());
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_items_are_returned_in_save_order() {
        let store = InMemoryOrderStore::new();
        let order = store.create(new_order(1, 10)).await.unwrap();

        store.save_item(new_item(order.id, "M2", 1, 500)).await.unwrap();
        store.save_item(new_item(order.id, "M1", 2, 1000)).await.unwrap();

        let items = store.find_items_by_order_id(order.id).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.medicine_id.as_str()).collect();
        assert_eq!(ids, vec!["M2", "M1"]);
        assert_eq!(items[1].total_price.cents(), 2000);

        let loaded = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.items, items);
    }

    #[tokio::test]
    async fn test_save_item_for_unknown_order_fails() {
        let store = InMemoryOrderStore::new();
        let missing = OrderId::new();
        let result = store.save_item(new_item(missing, "M1", 1, 100)).await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_save_updates_total_and_status() {
        let store = InMemoryOrderStore::new();
        let mut order = store.create(new_order(1, 10)).await.unwrap();
        let item = store.save_item(new_item(order.id, "M1", 2, 1000)).await.unwrap();

        order.attach_item(item);
        order.place(Money::from_cents(2000)).unwrap();
        let saved = store.save(&order).await.unwrap();

        assert_eq!(saved.status, OrderStatus::Placed);
        assert_eq!(saved.total_amount.cents(), 2000);
        assert_eq!(saved.items.len(), 1);
    }

    #[tokio::test]
    async fn test_save_unknown_order_fails() {
        let store = InMemoryOrderStore::new();
        let order = Order::from_new(OrderId::new(), new_order(1, 1));
        assert!(matches!(
            store.save(&order).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_user_and_pharmacy() {
        let store = InMemoryOrderStore::new();
        store.create(new_order(1, 10)).await.unwrap();
        store.create(new_order(1, 20)).await.unwrap();
        store.create(new_order(2, 10)).await.unwrap();

        assert_eq!(store.find_by_user_id(UserId::new(1)).await.unwrap().len(), 2);
        assert_eq!(store.find_by_user_id(UserId::new(3)).await.unwrap().len(), 0);
        assert_eq!(
            store
                .find_by_pharmacy_id(PharmacyId::new(10))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_delete_removes_order_and_items() {
        let store = InMemoryOrderStore::new();
        let order = store.create(new_order(1, 10)).await.unwrap();
        store.save_item(new_item(order.id, "M1", 1, 100)).await.unwrap();
        store.save_item(new_item(order.id, "M2", 1, 100)).await.unwrap();

        assert_eq!(store.delete_items_by_order_id(order.id).await.unwrap(), 2);
        store.delete(order.id).await.unwrap();

        assert!(store.find_by_id(order.id).await.unwrap().is_none());
        assert_eq!(store.item_count().await, 0);

        // Deleting again is a no-op
        store.delete(order.id).await.unwrap();
        assert_eq!(store.delete_items_by_order_id(order.id).await.unwrap(), 0);
    }
}
