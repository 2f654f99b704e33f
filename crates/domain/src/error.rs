//! Domain error types.

use common::OrderId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by the order model and its lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order has progressed past the point where the user may cancel it.
    #[error("Order is already out for delivery or delivered (current status: {current})")]
    AlreadyOutForDelivery { current: OrderStatus },

    /// The acting role may not request this status from the current one.
    #[error("Unauthorized transition: {actor} cannot move order from {current} to {requested}")]
    UnauthorizedTransition {
        actor: &'static str,
        current: OrderStatus,
        requested: OrderStatus,
    },

    /// An order cannot be placed without at least one item.
    #[error("Order {0} has no items")]
    NoItems(OrderId),

    /// A status string did not name a known status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
