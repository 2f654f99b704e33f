//! Order service error types.

use common::{MedicineId, OrderId, UserId};
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

use crate::services::UpstreamError;

/// Errors returned by `place_order`.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The user's cart has no lines. No order was created.
    #[error("Cart is empty for user {0}")]
    CartEmpty(UserId),

    /// A cart line asked for zero units.
    #[error("Invalid quantity {quantity} for medicine {medicine_id}")]
    InvalidQuantity {
        medicine_id: MedicineId,
        quantity: u32,
    },

    #[error("Medicine not found with id: {0}")]
    MedicineNotFound(MedicineId),

    /// The medicine service reported less stock than the line asks for.
    #[error("Medicine {name} is out of stock")]
    OutOfStock {
        medicine_id: MedicineId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// The conditional stock decrement did not succeed.
    #[error("Failed to reduce stock for medicine {medicine_id}: {source}")]
    StockReductionFailed {
        medicine_id: MedicineId,
        #[source]
        source: UpstreamError,
    },

    /// A line total or the order total does not fit in the money type.
    #[error("Order amount overflows at medicine {0}")]
    AmountOverflow(MedicineId),

    #[error("Failed to clear cart: {0}")]
    CartClearFailed(#[source] UpstreamError),

    #[error("Cart service unavailable: {0}")]
    CartServiceUnavailable(#[source] UpstreamError),

    #[error("Medicine service unavailable: {0}")]
    MedicineServiceUnavailable(#[source] UpstreamError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

impl PlacementError {
    /// Short label used as the `reason` metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            PlacementError::CartEmpty(_) => "cart_empty",
            PlacementError::InvalidQuantity { .. } => "invalid_quantity",
            PlacementError::MedicineNotFound(_) => "medicine_not_found",
            PlacementError::OutOfStock { .. } => "out_of_stock",
            PlacementError::StockReductionFailed { .. } => "stock_reduction_failed",
            PlacementError::AmountOverflow(_) => "amount_overflow",
            PlacementError::CartClearFailed(_) => "cart_clear_failed",
            PlacementError::CartServiceUnavailable(_) => "cart_service_unavailable",
            PlacementError::MedicineServiceUnavailable(_) => "medicine_service_unavailable",
            PlacementError::Order(_) => "order",
            PlacementError::Store(_) => "store",
        }
    }
}

/// Errors returned by status updates and order queries.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("Order not found with id: {0}")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Transition(#[from] OrderError),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}
