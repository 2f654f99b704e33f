//! Order status.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Placed ──┬──► OutForDelivery ──► Delivered
///                      ├──► Cancelled
///                      └──► Delivered
/// ```
///
/// `Pending` only exists while a placement is in flight. `Delivered` may be
/// requested by the user from any status; see [`crate::next_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order shell persisted, items still being attached.
    #[default]
    Pending,

    /// All lines reserved and the total computed.
    Placed,

    /// The pharmacy has dispatched the order.
    #[serde(alias = "OUT_OF_DELIVERY")]
    OutForDelivery,

    /// Order has been delivered (terminal state).
    Delivered,

    /// Order was cancelled by the user (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the user may still cancel the order.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Placed)
    }

    /// Returns true if the pharmacy may dispatch the order.
    pub fn can_dispatch(&self) -> bool {
        matches!(self, OrderStatus::Placed)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Placed => "PLACED",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PLACED" => Ok(OrderStatus::Placed),
            "OUT_FOR_DELIVERY" | "OUT_OF_DELIVERY" => Ok(OrderStatus::OutForDelivery),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}
