use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::transaction::Transaction;

/// Ownership status of a product. `owned` is the only value validation
/// looks at; anything else is stored as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductStatus {
    Owned,
    Other(String),
}

impl ProductStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Owned => "owned",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ProductStatus {
    fn from(s: String) -> Self {
        match s.trim() {
            "owned" => Self::Owned,
            _ => Self::Other(s),
        }
    }
}

impl From<ProductStatus> for String {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Owned => "owned".to_string(),
            ProductStatus::Other(s) => s,
        }
    }
}

/// Purchasable plan held by a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[validate(length(min = 1, max = 255))]
    pub plan_id: String,
    #[validate(length(min = 1, max = 255))]
    pub subscription_id: String,
    #[validate(custom(function = "validate_product_status"))]
    pub status: ProductStatus,
}

impl Product {
    pub fn is_owned(&self) -> bool {
        self.status == ProductStatus::Owned
    }

    fn trimmed(self) -> Self {
        Self {
            plan_id: self.plan_id.trim().to_string(),
            subscription_id: self.subscription_id.trim().to_string(),
            status: ProductStatus::from(self.status.as_str().trim().to_string()),
        }
    }
}

fn validate_product_status(status: &ProductStatus) -> Result<(), validator::ValidationError> {
    let len = status.as_str().len();
    if len == 0 || len > 255 {
        return Err(validator::ValidationError::new("length"));
    }
    Ok(())
}

/// Create / full-update request body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberPayload {
    #[validate(length(min = 1, max = 255))]
    pub user_id: String,
    #[validate(length(min = 1, max = 255))]
    pub country: String,
    #[validate(length(min = 1, max = 255))]
    pub status: String,
    #[validate(nested)]
    pub product: Option<Product>,
    pub transaction: Option<Transaction>,
}

impl SubscriberPayload {
    /// Trim string fields, then check the field constraints
    pub fn into_record(self) -> Result<SubscriberRecord, validator::ValidationErrors> {
        let payload = Self {
            user_id: self.user_id.trim().to_string(),
            country: self.country.trim().to_string(),
            status: self.status.trim().to_string(),
            product: self.product.map(Product::trimmed),
            transaction: self.transaction,
        };
        payload.validate()?;

        Ok(SubscriberRecord {
            user_id: payload.user_id,
            country: payload.country,
            status: payload.status,
            product: payload.product,
            transaction: payload.transaction,
        })
    }
}

/// Subscriber document about to be persisted. This is what the
/// validation hooks inspect and annotate.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberRecord {
    pub user_id: String,
    pub country: String,
    pub status: String,
    pub product: Option<Product>,
    pub transaction: Option<Transaction>,
}

/// Stored subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    pub user_id: String,
    pub country: String,
    pub status: String,
    pub product: Option<Product>,
    pub transaction: Option<Transaction>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Subscriber {
    pub fn to_record(&self) -> SubscriberRecord {
        SubscriberRecord {
            user_id: self.user_id.clone(),
            country: self.country.clone(),
            status: self.status.clone(),
            product: self.product.clone(),
            transaction: self.transaction.clone(),
        }
    }
}
