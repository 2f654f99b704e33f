//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::routes::orders::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, PharmacyId, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use orders::{CartLine, CompensationMode, InMemoryCartService, InMemoryMedicineService};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

const USER: i64 = 42;
const PHARMACY: i64 = 7;

struct TestApp {
    router: axum::Router,
    cart: InMemoryCartService,
    medicine: InMemoryMedicineService,
}

fn setup() -> TestApp {
    let cart = InMemoryCartService::new();
    let medicine = InMemoryMedicineService::new();
    medicine.stock("M1", "Paracetamol", Money::from_cents(1000), 10);
    medicine.stock("M2", "Ibuprofen", Money::from_cents(500), 10);
    medicine.stock("M3", "Amoxicillin", Money::from_cents(1250), 3);

    let state = Arc::new(AppState::new(
        InMemoryOrderStore::new(),
        Arc::new(cart.clone()),
        Arc::new(medicine.clone()),
        CompensationMode::Compensate,
    ));
    let router = api::create_app(state, get_metrics_handle());

    TestApp {
        router,
        cart,
        medicine,
    }
}

impl TestApp {
    fn add_to_cart(&self, medicine: &str, quantity: u32) {
        self.cart.add_line(CartLine::new(
            UserId::new(USER),
            PharmacyId::new(PHARMACY),
            medicine,
            quantity,
        ));
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn place(&self) -> (StatusCode, Value) {
        self.send("POST", &format!("/users/{USER}/orders"), None)
            .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = app.send("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_place_order_returns_created_view() {
    let app = setup();
    app.add_to_cart("M1", 2);
    app.add_to_cart("M2", 1);

    let (status, json) = app.place().await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "PLACED");
    assert_eq!(json["user_id"], USER);
    assert_eq!(json["pharmacy_id"], PHARMACY);
    assert_eq!(json["total_amount_cents"], 2500);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["medicine_id"], "M1");
    assert_eq!(items[0]["total_price_cents"], 2000);
    assert!(app.cart.lines(UserId::new(USER)).is_empty());
}

#[tokio::test]
async fn test_place_order_with_empty_cart() {
    let app = setup();

    let (status, json) = app.place().await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], format!("Cart is empty for user {USER}"));
}

#[tokio::test]
async fn test_place_order_out_of_stock() {
    let app = setup();
    app.add_to_cart("M3", 5);

    let (status, json) = app.place().await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Medicine Amoxicillin is out of stock");
    assert!(app.medicine.stock_calls().is_empty());
    assert_eq!(app.cart.lines(UserId::new(USER)).len(), 1);
}

#[tokio::test]
async fn test_place_order_with_cart_service_down() {
    let app = setup();
    app.cart.set_unavailable(true);

    let (status, json) = app.place().await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("Cart service unavailable"));
}

#[tokio::test]
async fn test_invalid_user_id() {
    let app = setup();

    let (status, json) = app.send("POST", "/users/abc/orders", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid user_id"));
}

#[tokio::test]
async fn test_get_order_and_unknown_order() {
    let app = setup();
    app.add_to_cart("M1", 1);
    let (_, placed) = app.place().await;
    let order_id = placed["id"].as_str().unwrap().to_string();

    let (status, json) = app.send("GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], order_id.as_str());
    assert_eq!(json["items"][0]["order_id"], order_id.as_str());

    let (status, _) = app
        .send(
            "GET",
            "/orders/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_by_user_and_pharmacy() {
    let app = setup();
    app.add_to_cart("M1", 1);
    app.place().await;
    app.add_to_cart("M2", 2);
    app.place().await;

    let (status, json) = app
        .send("GET", &format!("/users/{USER}/orders"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = app
        .send("GET", &format!("/pharmacies/{PHARMACY}/orders"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = app.send("GET", "/pharmacies/999/orders", None).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_cancel_then_cancel_again() {
    let app = setup();
    app.add_to_cart("M1", 1);
    let (_, placed) = app.place().await;
    let uri = format!(
        "/users/{USER}/orders/{}/status",
        placed["id"].as_str().unwrap()
    );

    let (status, json) = app
        .send("PUT", &uri, Some(json!({ "status": "CANCELLED" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");

    let (status, _) = app
        .send("PUT", &uri, Some(json!({ "status": "CANCELLED" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pharmacy_dispatch_with_legacy_spelling() {
    let app = setup();
    app.add_to_cart("M1", 1);
    let (_, placed) = app.place().await;
    let order_id = placed["id"].as_str().unwrap();

    let (status, json) = app
        .send(
            "PUT",
            &format!("/pharmacies/{PHARMACY}/orders/{order_id}/status"),
            Some(json!({ "status": "OUT_OF_DELIVERY" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OUT_FOR_DELIVERY");

    let (status, json) = app
        .send(
            "PUT",
            &format!("/users/{USER}/orders/{order_id}/status"),
            Some(json!({ "status": "DELIVERED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "DELIVERED");
}

#[tokio::test]
async fn test_pharmacy_cannot_dispatch_cancelled_order() {
    let app = setup();
    app.add_to_cart("M1", 1);
    let (_, placed) = app.place().await;
    let order_id = placed["id"].as_str().unwrap();

    app.send(
        "PUT",
        &format!("/users/{USER}/orders/{order_id}/status"),
        Some(json!({ "status": "CANCELLED" })),
    )
    .await;

    let (status, json) = app
        .send(
            "PUT",
            &format!("/pharmacies/{PHARMACY}/orders/{order_id}/status"),
            Some(json!({ "status": "OUT_FOR_DELIVERY" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].as_str().unwrap().contains("Unauthorized transition"));
}

#[tokio::test]
async fn test_unknown_status_is_bad_request() {
    let app = setup();
    app.add_to_cart("M1", 1);
    let (_, placed) = app.place().await;
    let order_id = placed["id"].as_str().unwrap();

    let (status, json) = app
        .send(
            "PUT",
            &format!("/users/{USER}/orders/{order_id}/status"),
            Some(json!({ "status": "SHIPPED" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unknown order status: SHIPPED");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    app.add_to_cart("M1", 1);
    app.place().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("order_placements_total"));
}
