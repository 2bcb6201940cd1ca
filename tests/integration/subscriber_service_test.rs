use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::json;
use std::sync::Arc;
use subscribers::{
    error::{ApiError, ValidationError},
    models::{
        subscriber::{Product, ProductStatus, SubscriberRecord},
        transaction::{Transaction, TransactionState},
    },
    services::{SubscriberService, SubscriptionValidator},
};
use time::Duration;
use uuid::Uuid;

use super::support::{test_config, test_database_url, FakeBilling};

/// Helper to setup test database
async fn setup_test_db() -> DatabaseConnection {
    super::setup_test_environment().await;

    let db = Database::connect(&test_database_url())
        .await
        .expect("Failed to connect to test database");

    // Run migrations to ensure tables exist
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

fn service(db: DatabaseConnection, billing: Arc<FakeBilling>) -> SubscriberService {
    let validator = Arc::new(SubscriptionValidator::new(billing, &test_config().billing));
    SubscriberService::new(db, validator)
}

/// Record with unique identifiers so tests can share a database
fn record(plan_id: &str, transaction: Option<Transaction>) -> SubscriberRecord {
    let suffix = Uuid::new_v4();
    SubscriberRecord {
        user_id: format!("user-{}", suffix),
        country: format!("country-{}", suffix),
        status: "active".to_string(),
        product: Some(Product {
            plan_id: plan_id.to_string(),
            subscription_id: format!("sub-{}", suffix),
            status: ProductStatus::Owned,
        }),
        transaction,
    }
}

fn approved(product_id: &str, token: &str) -> Transaction {
    serde_json::from_value(json!({
        "state": "approved",
        "transactionId": format!("GPA.{}", Uuid::new_v4()),
        "nativePurchase": { "productId": product_id, "purchaseToken": token }
    }))
    .unwrap()
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_create_persists_verified_expiry() {
    let db = setup_test_db().await;
    let billing = FakeBilling::expiring_in(-Duration::days(3));
    let service = service(db, billing.clone());

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let created = service
        .create(record(&plan_id, Some(approved(&plan_id, "tok"))))
        .await
        .unwrap();

    let transaction = created.transaction.as_ref().unwrap();
    assert_eq!(transaction.is_expired, Some(true));
    assert_eq!(transaction.is_billing_retry_period, Some(true));
    assert!(transaction.extra.contains_key("transactionId"));
    assert_eq!(billing.calls(), 1);

    let fetched = service.get_by_user_id(&created.user_id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_rejected_update_keeps_stored_record() {
    let db = setup_test_db().await;
    let service = service(db, FakeBilling::expiring_in(Duration::days(30)));

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let created = service
        .create(record(&plan_id, Some(approved(&plan_id, "tok"))))
        .await
        .unwrap();

    let result = service
        .replace_transaction(created.id, approved("another-plan", "tok"))
        .await;
    assert!(matches!(
        result,
        Err(ApiError::Validation(ValidationError::PlanMismatch { .. }))
    ));

    let result = service
        .replace_transaction(created.id, approved(&plan_id, "revoked"))
        .await;
    assert!(matches!(
        result,
        Err(ApiError::Validation(ValidationError::PurchaseVerification))
    ));

    let fetched = service.get_by_user_id(&created.user_id).await.unwrap();
    assert_eq!(fetched.transaction, created.transaction);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_replace_transaction_overwrites_snapshot() {
    let db = setup_test_db().await;
    let service = service(db, FakeBilling::expiring_in(Duration::days(30)));

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let created = service
        .create(record(&plan_id, Some(approved(&plan_id, "first"))))
        .await
        .unwrap();

    let replacement = approved(&plan_id, "second");
    let updated = service
        .replace_transaction(created.id, replacement.clone())
        .await
        .unwrap();

    let stored = updated.transaction.unwrap();
    assert_eq!(stored.extra["transactionId"], replacement.extra["transactionId"]);
    assert_eq!(
        stored.native_purchase.unwrap().purchase_token.as_deref(),
        Some("second")
    );
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_duplicate_user_id_is_conflict() {
    let db = setup_test_db().await;
    let service = service(db, FakeBilling::expiring_in(Duration::days(30)));

    let first = record(&format!("plan-{}", Uuid::new_v4()), None);
    let mut first = SubscriberRecord {
        product: first.product.map(|p| Product {
            status: ProductStatus::from("requested".to_string()),
            ..p
        }),
        ..first
    };
    service.create(first.clone()).await.unwrap();

    first.country = format!("country-{}", Uuid::new_v4());
    first.product = None;
    let result = service.create(first).await;

    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_delete_then_lookup_is_not_found() {
    let db = setup_test_db().await;
    let service = service(db, FakeBilling::expiring_in(Duration::days(30)));

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let created = service
        .create(record(&plan_id, Some(approved(&plan_id, "tok"))))
        .await
        .unwrap();

    service.delete(created.id).await.unwrap();

    assert!(matches!(
        service.get_by_user_id(&created.user_id).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        service.delete(created.id).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_update_replaces_whole_document() {
    let db = setup_test_db().await;
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let service = service(db, billing.clone());

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let created = service
        .create(record(&plan_id, Some(approved(&plan_id, "tok"))))
        .await
        .unwrap();

    let upgraded_plan = format!("plan-{}", Uuid::new_v4());
    let mut replacement = record(&upgraded_plan, Some(approved(&upgraded_plan, "upgrade")));
    replacement.user_id = created.user_id.clone();
    replacement.status = "upgraded".to_string();

    let updated = service.update(created.id, replacement.clone()).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.status, "upgraded");
    assert_eq!(updated.country, replacement.country);
    assert_eq!(updated.product.as_ref().unwrap().plan_id, upgraded_plan);
    assert_eq!(
        updated.transaction.as_ref().unwrap().is_expired,
        Some(false)
    );
    assert_eq!(billing.calls(), 2);

    let fetched = service.get_by_user_id(&created.user_id).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_rejected_update_leaves_row_unchanged() {
    let db = setup_test_db().await;
    let billing = FakeBilling::expiring_in(Duration::days(30));
    let service = service(db, billing.clone());

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let created = service
        .create(record(&plan_id, Some(approved(&plan_id, "tok"))))
        .await
        .unwrap();

    let mut pending = approved(&plan_id, "tok");
    pending.state = Some(TransactionState::from("pending".to_string()));
    let mut replacement = record(&plan_id, Some(pending));
    replacement.user_id = created.user_id.clone();
    replacement.status = "cancelled".to_string();

    let result = service.update(created.id, replacement).await;

    assert!(matches!(
        result,
        Err(ApiError::Validation(ValidationError::InconsistentState))
    ));
    assert_eq!(billing.calls(), 1);

    let fetched = service.get_by_user_id(&created.user_id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_update_unknown_id_is_not_found() {
    let db = setup_test_db().await;
    let service = service(db, FakeBilling::expiring_in(Duration::days(30)));

    let plan_id = format!("plan-{}", Uuid::new_v4());
    let result = service
        .update(Uuid::new_v4(), record(&plan_id, Some(approved(&plan_id, "tok"))))
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}
