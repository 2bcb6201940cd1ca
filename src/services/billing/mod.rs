//! Billing authority access.
//!
//! The validator only sees [`BillingClient`]; the Google Play implementation
//! and its service-account credentials live in the submodules.

pub mod credentials;
pub mod google_play;

pub use credentials::{AccessToken, ServiceAccountTokenSource, TokenSource};
pub use google_play::GooglePlayClient;

use async_trait::async_trait;
use serde_json::Value;

/// `acknowledgementState` value for an acknowledged purchase
pub const ACKNOWLEDGED: i32 = 1;

/// Failures reaching or understanding the billing authority.
///
/// These never leave the validator; callers only see a generic
/// verification failure.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("invalid billing configuration: {0}")]
    Configuration(String),

    #[error("service account credentials unavailable: {0}")]
    Credentials(String),

    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("request to billing authority failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed billing response: {0}")]
    MalformedResponse(String),
}

/// What the authority reported for a subscription purchase.
///
/// A non-2xx answer is data, not an error: `status` carries the HTTP code and
/// `errors` the provider's error payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseStatus {
    pub status: u16,
    pub acknowledgement_state: Option<i32>,
    pub expiry_time_millis: Option<i64>,
    pub errors: Option<Value>,
}

impl PurchaseStatus {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledgement_state == Some(ACKNOWLEDGED)
    }
}

#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Look up a subscription purchase. Each call authenticates afresh.
    async fn get_subscription_purchase(
        &self,
        package_name: &str,
        subscription_id: &str,
        purchase_token: &str,
    ) -> Result<PurchaseStatus, BillingError>;
}
