use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::BillingConfig,
    error::ValidationError,
    models::{
        subscriber::SubscriberRecord,
        transaction::{NativePurchase, PurchaseExpiry, Transaction},
    },
    services::billing::{BillingClient, BillingError, PurchaseStatus},
};

/// Pre-persistence hooks for subscriber writes.
///
/// Runs the local consistency checks and, when the record carries a
/// transaction, confirms the native purchase with the billing authority.
pub struct SubscriptionValidator {
    billing: Arc<dyn BillingClient>,
    package_name: String,
    retry_window: Duration,
    require_acknowledgement: bool,
}

impl SubscriptionValidator {
    pub fn new(billing: Arc<dyn BillingClient>, config: &BillingConfig) -> Self {
        Self {
            billing,
            package_name: config.package_name.clone(),
            retry_window: Duration::days(config.billing_retry_days),
            require_acknowledgement: config.require_acknowledgement,
        }
    }

    /// Full hook chain. Local checks run first so an inconsistent record
    /// never reaches the billing authority. On success the transaction
    /// carries freshly computed expiry fields.
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    pub async fn validate(&self, record: &mut SubscriberRecord) -> Result<(), ValidationError> {
        Self::check_ownership_consistency(record)?;
        Self::check_plan_match(record)?;
        self.validate_transaction_field(record.transaction.as_mut())
            .await
    }

    /// An owned product requires an approved transaction.
    pub fn check_ownership_consistency(record: &SubscriberRecord) -> Result<(), ValidationError> {
        let owned = record.product.as_ref().is_some_and(|p| p.is_owned());
        let approved = record.transaction.as_ref().is_some_and(Transaction::is_approved);

        if owned && !approved {
            warn!(user_id = %record.user_id, "Owned product without an approved transaction");
            return Err(ValidationError::InconsistentState);
        }
        Ok(())
    }

    /// An approved transaction for an owned product must have purchased that
    /// product's plan. Vacuously true otherwise.
    pub fn check_plan_match(record: &SubscriberRecord) -> Result<(), ValidationError> {
        let (Some(product), Some(transaction)) = (&record.product, &record.transaction) else {
            return Ok(());
        };
        if !product.is_owned() || !transaction.is_approved() {
            return Ok(());
        }

        let purchased = transaction.purchased_product_id();
        if purchased == Some(product.plan_id.as_str()) {
            return Ok(());
        }

        warn!(
            user_id = %record.user_id,
            plan_id = %product.plan_id,
            purchased = ?purchased,
            "Transaction plan does not match subscriber product"
        );
        Err(ValidationError::PlanMismatch {
            plan_id: product.plan_id.clone(),
            purchased: purchased.map(str::to_string),
        })
    }

    /// Verify the transaction's native purchase and write the expiry fields.
    /// A subscriber without a transaction is valid as is.
    pub async fn validate_transaction_field(
        &self,
        transaction: Option<&mut Transaction>,
    ) -> Result<(), ValidationError> {
        let Some(transaction) = transaction else {
            return Ok(());
        };

        let expiry = self
            .verify_native_purchase(transaction.native_purchase.as_ref())
            .await?;
        transaction.apply_expiry(expiry);
        Ok(())
    }

    /// Confirm a purchase with the billing authority and derive its expiry
    /// fields. Nothing is mutated here; the caller applies the result.
    #[instrument(skip(self, native_purchase))]
    pub async fn verify_native_purchase(
        &self,
        native_purchase: Option<&NativePurchase>,
    ) -> Result<PurchaseExpiry, ValidationError> {
        let subscription_id = native_purchase
            .and_then(NativePurchase::subscription_id)
            .ok_or(ValidationError::MissingSubscriptionId)?;

        let purchase_token = native_purchase
            .and_then(|p| p.purchase_token.as_deref())
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                warn!(subscription_id, "Native purchase has no purchase token");
                ValidationError::PurchaseVerification
            })?;

        let token_digest = token_digest(purchase_token);
        debug!(subscription_id, token_digest = %token_digest, "Verifying native purchase");

        let status = self
            .billing
            .get_subscription_purchase(&self.package_name, subscription_id, purchase_token)
            .await
            .map_err(|e| verification_failed(subscription_id, &token_digest, e))?;

        if self.is_rejected(&status) {
            error!(
                subscription_id,
                token_digest = %token_digest,
                status = status.status,
                acknowledgement_state = ?status.acknowledgement_state,
                errors = ?status.errors,
                "Billing authority rejected purchase"
            );
            return Err(ValidationError::PurchaseVerification);
        }

        let expiry_date = status
            .expiry_time_millis
            .ok_or_else(|| {
                BillingError::MalformedResponse("expiryTimeMillis missing".to_string())
            })
            .and_then(expiry_from_millis)
            .map_err(|e| verification_failed(subscription_id, &token_digest, e))?;

        let expiry =
            PurchaseExpiry::compute(expiry_date, OffsetDateTime::now_utc(), self.retry_window);

        info!(
            subscription_id,
            token_digest = %token_digest,
            expiry_date = %expiry.expiry_date,
            state = ?expiry.state(),
            "Verified native purchase"
        );

        Ok(expiry)
    }

    /// Whether the authority's answer counts as a failed verification.
    ///
    /// By default only an answer that is both non-200 and unacknowledged is
    /// rejected, so a non-200 acknowledged answer passes. The strict mode
    /// requires 200 and acknowledged.
    fn is_rejected(&self, status: &PurchaseStatus) -> bool {
        let ok = status.status == 200;
        if self.require_acknowledgement {
            !ok || !status.is_acknowledged()
        } else {
            !ok && !status.is_acknowledged()
        }
    }
}

fn expiry_from_millis(millis: i64) -> Result<OffsetDateTime, BillingError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|e| BillingError::MalformedResponse(format!("expiryTimeMillis {}: {}", millis, e)))
}

fn verification_failed(
    subscription_id: &str,
    token_digest: &str,
    err: BillingError,
) -> ValidationError {
    error!(
        subscription_id,
        token_digest = %token_digest,
        error = %err,
        "Error verifying purchase"
    );
    ValidationError::PurchaseVerification
}

/// Short digest identifying a purchase token in logs
fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}
