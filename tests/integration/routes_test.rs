use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use subscribers::{routes::create_router, AppState};
use time::Duration;
use tower::ServiceExt;

use super::support::{test_config, FakeBilling};

/// Router over a disconnected database: only requests rejected before
/// persistence can succeed here
fn app(billing: Arc<FakeBilling>) -> Router {
    let state = AppState::with_billing(DatabaseConnection::Disconnected, billing, test_config());
    create_router(state)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn subscriber_body(product_status: &str, state: &str, product_id: &str, token: &str) -> Value {
    json!({
        "userId": "user-1",
        "country": "AR",
        "status": "active",
        "product": {
            "planId": "one_year_subscription",
            "subscriptionId": "sub-1",
            "status": product_status
        },
        "transaction": {
            "state": state,
            "nativePurchase": {
                "productId": product_id,
                "purchaseToken": token
            }
        }
    })
}

#[tokio::test]
async fn test_health() {
    let app = app(FakeBilling::expiring_in(Duration::days(30)));
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_owned_without_approval_is_rejected_before_billing() {
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let body = subscriber_body("owned", "pending", "one_year_subscription", "tok");

    let (status, json) = post_json(app(billing.clone()), "/api/v1/subscribers", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "INCONSISTENT_STATE");
    assert_eq!(billing.calls(), 0);
}

#[tokio::test]
async fn test_plan_mismatch_is_rejected() {
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let body = subscriber_body("owned", "approved", "one_month_subscription", "tok");

    let (status, json) = post_json(app(billing.clone()), "/api/v1/subscribers", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "PLAN_MISMATCH");
    assert_eq!(billing.calls(), 0);
}

#[tokio::test]
async fn test_missing_subscription_id_is_rejected() {
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let body = subscriber_body("requested", "approved", "", "tok");

    let (status, json) = post_json(app(billing.clone()), "/api/v1/subscribers", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "MISSING_SUBSCRIPTION_ID");
    assert_eq!(billing.calls(), 0);
}

#[tokio::test]
async fn test_rejected_purchase_hides_provider_details() {
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let body = subscriber_body("owned", "approved", "one_year_subscription", "revoked");

    let (status, json) = post_json(app(billing.clone()), "/api/v1/subscribers", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "PURCHASE_VERIFICATION_FAILED");
    assert!(!json.to_string().contains("purchaseTokenNoLongerValid"));
    assert_eq!(billing.calls(), 1);
}

#[tokio::test]
async fn test_blank_required_field_is_bad_request() {
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let body = json!({ "userId": "  ", "country": "AR", "status": "active" });

    let (status, json) = post_json(app(billing.clone()), "/api/v1/subscribers", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert_eq!(billing.calls(), 0);
}

#[tokio::test]
async fn test_delete_requires_uuid_path() {
    let app = app(FakeBilling::expiring_in(Duration::days(30)));
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/subscribers/not-a-uuid")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
