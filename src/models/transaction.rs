use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

/// Purchase state reported by the client billing library.
///
/// Only `approved` carries meaning for validation; any other value is kept
/// verbatim so the stored snapshot matches what the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionState {
    Approved,
    Other(String),
}

impl From<String> for TransactionState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "approved" => Self::Approved,
            _ => Self::Other(s),
        }
    }
}

impl From<TransactionState> for String {
    fn from(state: TransactionState) -> Self {
        match state {
            TransactionState::Approved => "approved".to_string(),
            TransactionState::Other(s) => s,
        }
    }
}

/// Store-side purchase reference carried inside a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativePurchase {
    /// Subscription (SKU) identifier at the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NativePurchase {
    /// Product id, treating a blank string as absent
    pub fn subscription_id(&self) -> Option<&str> {
        self.product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Embedded purchase snapshot of a subscriber.
///
/// The expiry fields are written by the validator after the billing
/// authority confirmed the purchase; client-supplied values are overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TransactionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_purchase: Option<NativePurchase>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expiry_date: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_billing_retry_period: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    pub fn is_approved(&self) -> bool {
        matches!(self.state, Some(TransactionState::Approved))
    }

    /// Product id the transaction claims to have purchased
    pub fn purchased_product_id(&self) -> Option<&str> {
        self.native_purchase
            .as_ref()
            .and_then(|p| p.product_id.as_deref())
    }

    pub fn apply_expiry(&mut self, expiry: PurchaseExpiry) {
        self.expiry_date = Some(expiry.expiry_date);
        self.is_expired = Some(expiry.is_expired);
        self.is_billing_retry_period = Some(expiry.is_billing_retry_period);
    }
}

/// Where a purchase stands relative to its expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryState {
    /// Not expired
    Active,
    /// Expired, store still retrying the charge
    Grace,
    /// Expired past the retry window. Terminal.
    Lapsed,
}

impl ExpiryState {
    pub fn at(expiry_date: OffsetDateTime, now: OffsetDateTime, retry_window: Duration) -> Self {
        if now <= expiry_date {
            Self::Active
        } else if now <= expiry_date + retry_window {
            Self::Grace
        } else {
            Self::Lapsed
        }
    }
}

/// Expiry fields derived from a confirmed purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseExpiry {
    pub expiry_date: OffsetDateTime,
    pub is_expired: bool,
    pub is_billing_retry_period: bool,
}

impl PurchaseExpiry {
    pub fn compute(expiry_date: OffsetDateTime, now: OffsetDateTime, retry_window: Duration) -> Self {
        let state = ExpiryState::at(expiry_date, now, retry_window);
        Self {
            expiry_date,
            is_expired: state != ExpiryState::Active,
            is_billing_retry_period: state == ExpiryState::Grace,
        }
    }

    pub fn state(&self) -> ExpiryState {
        match (self.is_expired, self.is_billing_retry_period) {
            (false, _) => ExpiryState::Active,
            (true, true) => ExpiryState::Grace,
            (true, false) => ExpiryState::Lapsed,
        }
    }
}
