//! Externally visible order projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Order, OrderItem, OrderStatus};

/// Order as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub user_id: i64,
    pub pharmacy_id: i64,
    pub status: OrderStatus,
    pub order_date_time: DateTime<Utc>,
    pub total_amount_cents: i64,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub id: String,
    pub order_id: String,
    pub medicine_id: String,
    pub quantity: u32,
    pub price_per_unit_cents: i64,
    pub total_price_cents: i64,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.to_string(),
            order_id: item.order_id.to_string(),
            medicine_id: item.medicine_id.to_string(),
            quantity: item.quantity,
            price_per_unit_cents: item.price_per_unit.cents(),
            total_price_cents: item.total_price.cents(),
        }
    }
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.as_i64(),
            pharmacy_id: order.pharmacy_id.as_i64(),
            status: order.status,
            order_date_time: order.order_date_time,
            total_amount_cents: order.total_amount.cents(),
            items: order.items.iter().map(OrderItemView::from).collect(),
        }
    }
}
