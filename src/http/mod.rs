//! HTTP surface

pub mod error;
pub mod handlers;

use std::sync::Arc;
use axum::{routing::{get, post}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::tenant::TenantResolver;

pub use error::Envelope;

#[derive(Clone)]
pub struct AppState {
    pub tenants: Arc<dyn TenantResolver>,
    pub nats: Option<async_nats::Client>,
}

pub fn router(state: AppState) -> Router {
    let split_bills = Router::new()
        .route("/split/:order_id", post(handlers::split_by_items))
        .route("/split-equally/:order_id", post(handlers::split_equally))
        .route("/payment/:split_bill_id/:split_number", post(handlers::record_payment))
        .route("/:order_id", get(handlers::get_split_bill));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "split-bill-engine"})) }))
        .nest("/api/v1/split-bills", split_bills)
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;
    use crate::domain::aggregates::{Order, OrderItem, OrderStatus};
    use crate::tenant::MemoryTenants;

    const TENANT: &str = "spice-garden";

    async fn app_with_order() -> (Router, Arc<MemoryTenants>, Order) {
        let tenants = Arc::new(MemoryTenants::new());
        let mut order = Order::create("ORD-9", vec![
            OrderItem { menu_id: Uuid::new_v4(), name: "Biryani".into(), quantity: 2, item_total: Decimal::from(200) },
            OrderItem { menu_id: Uuid::new_v4(), name: "Raita".into(), quantity: 1, item_total: Decimal::from(70) },
        ]);
        order.subtotal = Some(Decimal::from(270));
        order.gst = Some(Decimal::from(15));
        order.sgst = Some(Decimal::from(15));
        order.total_amount = Decimal::from(300);
        tenants.store(TENANT).await.insert_order(order.clone()).await;
        let app = router(AppState { tenants: tenants.clone(), nats: None });
        (app, tenants, order)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri).header(handlers::TENANT_HEADER, TENANT);
        let body = match body {
            Some(v) => { req = req.header("content-type", "application/json"); Body::from(v.to_string()) }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_split_equally_then_pay_all() {
        let (app, tenants, order) = app_with_order().await;
        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/split-equally/{}", order.id), Some(json!({"numberOfSplits": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["splitBill"]["status"], "ACTIVE");
        assert_eq!(body["splitBill"]["splits"][0]["totalAmount"], 150.0);
        assert_eq!(body["splitBill"]["splits"][1]["customerName"], "Split 2");
        let bill_id = body["splitBill"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/payment/{}/1", bill_id), Some(json!({"method": "CASH"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allPaid"], false);

        let (_, body) = call(&app, "POST", &format!("/api/v1/split-bills/payment/{}/2", bill_id), Some(json!({"method": "UPI", "transactionId": "upi-77"}))).await;
        assert_eq!(body["allPaid"], true);
        assert_eq!(body["splitBill"]["status"], "COMPLETED");
        assert_eq!(body["splitBill"]["splits"][1]["paymentDetails"]["transactionId"], "upi-77");

        let stored = tenants.store(TENANT).await.order(order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);

        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/payment/{}/2", bill_id), Some(json!({"method": "CASH"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_split_by_items_and_fetch() {
        let (app, _, order) = app_with_order().await;
        let (a, b) = (order.items[0].menu_id, order.items[1].menu_id);
        let request = json!({"splits": [
            {"items": [{"menuId": a, "quantity": 1}]},
            {"items": [{"menuId": a, "quantity": 1}, {"menuId": b, "quantity": 1}], "customerName": "Meera"},
        ]});
        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/split/{}", order.id), Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["splitBill"]["splits"][0]["subtotal"], 100.0);
        assert_eq!(body["splitBill"]["splits"][1]["customerName"], "Meera");

        let (status, body) = call(&app, "GET", &format!("/api/v1/split-bills/{}", order.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["splitBill"]["originalOrderId"], order.id.to_string());
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (app, _, order) = app_with_order().await;
        let uri = format!("/api/v1/split-bills/split-equally/{}", order.id);
        let (status, body) = call(&app, "POST", &uri, Some(json!({"numberOfSplits": 11}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let one_split = json!({"splits": [{"items": [{"menuId": order.items[0].menu_id, "quantity": 1}]}]});
        let (status, _) = call(&app, "POST", &format!("/api/v1/split-bills/split/{}", order.id), Some(one_split)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let zero_qty = json!({"splits": [
            {"items": [{"menuId": order.items[0].menu_id, "quantity": 0}]},
            {"items": [{"menuId": order.items[1].menu_id, "quantity": 1}]},
        ]});
        let (status, _) = call(&app, "POST", &format!("/api/v1/split-bills/split/{}", order.id), Some(zero_qty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/api/v1/split-bills/split-equally/not-a-uuid", Some(json!({"numberOfSplits": 2}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", &format!("/api/v1/split-bills/payment/{}/0", Uuid::now_v7()), Some(json!({"method": "CASH"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_envelope() {
        let (app, _, order) = app_with_order().await;
        let (_, body) = call(&app, "POST", &format!("/api/v1/split-bills/split-equally/{}", order.id), Some(json!({"numberOfSplits": 2}))).await;
        let bill_id = body["splitBill"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/payment/{}/1", bill_id), Some(json!({"method": "CHEQUE"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("CHEQUE"));

        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/split-equally/{}", Uuid::now_v7()), Some(json!({"numberOfSplits": -3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let fractional = json!({"splits": [
            {"items": [{"menuId": order.items[0].menu_id, "quantity": 1.5}]},
            {"items": [{"menuId": order.items[1].menu_id, "quantity": 1}]},
        ]});
        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/split/{}", Uuid::now_v7()), Some(fractional)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let req = Request::builder().method("POST").uri(format!("/api/v1/split-bills/payment/{}/1", bill_id))
            .header(handlers::TENANT_HEADER, TENANT).body(Body::from(r#"{"method":"CASH"}"#)).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, "POST", &format!("/api/v1/split-bills/payment/{}/1", bill_id), Some(json!({"method": "CASH"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allPaid"], false);
    }

    #[tokio::test]
    async fn test_not_found_and_missing_tenant() {
        let (app, _, _) = app_with_order().await;
        let (status, body) = call(&app, "GET", &format!("/api/v1/split-bills/{}", Uuid::now_v7()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let req = Request::builder().uri(format!("/api/v1/split-bills/{}", Uuid::now_v7())).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
