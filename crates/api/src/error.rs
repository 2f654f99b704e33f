//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use order_store::StoreError;
use orders::{OrderServiceError, PlacementError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path parameter or body.
    BadRequest(String),
    /// Order placement failed.
    Placement(PlacementError),
    /// Status update or lookup failed.
    OrderService(OrderServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Placement(err) => placement_error_to_response(err),
            ApiError::OrderService(err) => order_service_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn placement_error_to_response(err: PlacementError) -> (StatusCode, String) {
    match &err {
        PlacementError::CartEmpty(_) | PlacementError::InvalidQuantity { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        PlacementError::MedicineNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        PlacementError::OutOfStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        PlacementError::AmountOverflow(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        PlacementError::StockReductionFailed { .. }
        | PlacementError::CartClearFailed(_)
        | PlacementError::CartServiceUnavailable(_)
        | PlacementError::MedicineServiceUnavailable(_) => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        PlacementError::Order(order_err) => order_error_to_response(order_err),
        PlacementError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn order_service_error_to_response(err: OrderServiceError) -> (StatusCode, String) {
    match &err {
        OrderServiceError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrderServiceError::Transition(order_err) => order_error_to_response(order_err),
        OrderServiceError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn order_error_to_response(err: &OrderError) -> (StatusCode, String) {
    let status = match err {
        OrderError::AlreadyOutForDelivery { .. } => StatusCode::CONFLICT,
        OrderError::UnauthorizedTransition { .. } => StatusCode::FORBIDDEN,
        OrderError::UnknownStatus(_) => StatusCode::BAD_REQUEST,
        OrderError::NoItems(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, err.to_string())
}

fn store_error_to_response(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        _ => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}

impl From<OrderServiceError> for ApiError {
    fn from(err: OrderServiceError) -> Self {
        ApiError::OrderService(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::OrderService(err.into())
    }
}
