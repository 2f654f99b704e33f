//! Domain layer for the pharmacy order service.
//!
//! This crate provides:
//! - The `Order` and `OrderItem` records produced by order placement
//! - `OrderStatus` and the role-gated lifecycle transitions
//! - `OrderView`, the externally visible projection of an order

pub mod error;
pub mod order;

pub use error::OrderError;
pub use order::{
    Actor, NewOrder, NewOrderItem, Order, OrderItem, OrderItemView, OrderStatus, OrderView,
    next_status,
};
