//! Order placement, status update and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, PharmacyId, UserId};
use domain::{OrderStatus, OrderView};
use order_store::{OrderItemStore, OrderStore};
use orders::{
    CartClient, CompensationMode, MedicineClient, OrderLifecycle, OrderPlacementCoordinator,
    OrderQueries,
};
use serde::Deserialize;

use crate::error::ApiError;

pub type SharedCartClient = Arc<dyn CartClient>;
pub type SharedMedicineClient = Arc<dyn MedicineClient>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore + OrderItemStore> {
    pub coordinator: OrderPlacementCoordinator<S, SharedCartClient, SharedMedicineClient>,
    pub lifecycle: OrderLifecycle<S>,
    pub queries: OrderQueries<S>,
}

impl<S: OrderStore + OrderItemStore + Clone> AppState<S> {
    pub fn new(
        store: S,
        cart: SharedCartClient,
        medicine: SharedMedicineClient,
        mode: CompensationMode,
    ) -> Self {
        Self {
            coordinator: OrderPlacementCoordinator::new(store.clone(), cart, medicine)
                .with_compensation(mode),
            lifecycle: OrderLifecycle::new(store.clone()),
            queries: OrderQueries::new(store),
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

impl StatusUpdateRequest {
    fn requested(&self) -> Result<OrderStatus, ApiError> {
        Ok(self.status.parse()?)
    }
}

// -- Path parsing --

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map(UserId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id {raw}: {e}")))
}

fn parse_pharmacy_id(raw: &str) -> Result<PharmacyId, ApiError> {
    raw.parse()
        .map(PharmacyId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid pharmacy_id {raw}: {e}")))
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order_id {raw}: {e}")))
}

// -- Handlers --

/// POST /users/{user_id}/orders: place an order from the user's cart.
#[tracing::instrument(skip(state))]
pub async fn place<S: OrderStore + OrderItemStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let order = state.coordinator.place_order(user_id).await?;
    Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
}

/// GET /users/{user_id}/orders
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S: OrderStore + OrderItemStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.queries.get_orders_by_user(user_id).await?))
}

/// PUT /users/{user_id}/orders/{order_id}/status: cancel or confirm delivery.
#[tracing::instrument(skip(state, req))]
pub async fn update_status_by_user<S: OrderStore + OrderItemStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, order_id)): Path<(String, String)>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let order_id = parse_order_id(&order_id)?;
    let order = state
        .lifecycle
        .update_status_by_user(user_id, order_id, req.requested()?)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// GET /pharmacies/{pharmacy_id}/orders
#[tracing::instrument(skip(state))]
pub async fn list_for_pharmacy<S: OrderStore + OrderItemStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(pharmacy_id): Path<String>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let pharmacy_id = parse_pharmacy_id(&pharmacy_id)?;
    Ok(Json(state.queries.get_orders_by_pharmacy(pharmacy_id).await?))
}

/// PUT /pharmacies/{pharmacy_id}/orders/{order_id}/status: dispatch an order.
#[tracing::instrument(skip(state, req))]
pub async fn update_status_by_pharmacy<S: OrderStore + OrderItemStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((pharmacy_id, order_id)): Path<(String, String)>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let pharmacy_id = parse_pharmacy_id(&pharmacy_id)?;
    let order_id = parse_order_id(&order_id)?;
    let order = state
        .lifecycle
        .update_status_by_pharmacy(pharmacy_id, order_id, req.requested()?)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// GET /orders/{order_id}
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + OrderItemStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    Ok(Json(state.queries.get_order_details(order_id).await?))
}
