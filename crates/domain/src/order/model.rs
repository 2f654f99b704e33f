//! Order and order item records.

use chrono::{DateTime, Utc};
use common::{MedicineId, Money, OrderId, OrderItemId, PharmacyId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

use super::lifecycle::{Actor, next_status};
use super::OrderStatus;

/// Fields of an order shell before the store assigns it an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub pharmacy_id: PharmacyId,
    pub order_date_time: DateTime<Utc>,
}

impl NewOrder {
    /// Creates an order shell timestamped now.
    pub fn now(user_id: UserId, pharmacy_id: PharmacyId) -> Self {
        Self {
            user_id,
            pharmacy_id,
            order_date_time: Utc::now(),
        }
    }
}

/// A persisted order.
///
/// `items` are kept in cart-read order. Once `place` succeeds,
/// `total_amount` equals the sum of the items' `total_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub pharmacy_id: PharmacyId,
    pub order_date_time: DateTime<Utc>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Materializes a freshly created shell: zero total, `Pending`, no items.
    pub fn from_new(id: OrderId, new: NewOrder) -> Self {
        Self {
            id,
            user_id: new.user_id,
            pharmacy_id: new.pharmacy_id,
            order_date_time: new.order_date_time,
            total_amount: Money::zero(),
            status: OrderStatus::Pending,
            items: Vec::new(),
        }
    }

    /// Appends a persisted item.
    pub fn attach_item(&mut self, item: OrderItem) {
        self.items.push(item);
    }

    /// Sum of the attached items' total prices.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|item| item.total_price).sum()
    }

    /// Finalizes placement with the accumulated `total`.
    pub fn place(&mut self, total: Money) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::NoItems(self.id));
        }
        debug_assert_eq!(total, self.items_total());
        self.total_amount = total;
        self.status = OrderStatus::Placed;
        Ok(())
    }

    /// Applies a status change requested by `actor`.
    ///
    /// Returns the previous status on success.
    pub fn request_status(
        &mut self,
        actor: &Actor,
        requested: OrderStatus,
    ) -> Result<OrderStatus, OrderError> {
        let next = next_status(self.status, actor, requested)?;
        Ok(std::mem::replace(&mut self.status, next))
    }
}

/// Fields of an order item before the store assigns it an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub medicine_id: MedicineId,
    pub quantity: u32,
    /// Medicine price at placement time.
    pub price_per_unit: Money,
}

impl NewOrderItem {
    pub fn total_price(&self) -> Money {
        self.price_per_unit.multiply(self.quantity)
    }
}

/// A persisted order line. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub medicine_id: MedicineId,
    pub quantity: u32,
    pub price_per_unit: Money,
    pub total_price: Money,
}

impl OrderItem {
    /// Materializes a freshly saved item.
    pub fn from_new(id: OrderItemId, new: NewOrderItem) -> Self {
        let total_price = new.total_price();
        Self {
            id,
            order_id: new.order_id,
            medicine_id: new.medicine_id,
            quantity: new.quantity,
            price_per_unit: new.price_per_unit,
            total_price,
        }
    }
}
