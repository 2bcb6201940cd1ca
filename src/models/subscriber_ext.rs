//! Conversions between the stored `entity::subscribers` row and the
//! subscriber document the service works with.

use anyhow::Context;
use entity::subscribers;
use sea_orm::ActiveValue::Set;

use super::{
    subscriber::{Product, ProductStatus, Subscriber, SubscriberRecord},
    transaction::Transaction,
};
use crate::error::{ApiError, Result};

pub trait SubscriberModelExt {
    fn into_subscriber(self) -> Result<Subscriber>;
}

impl SubscriberModelExt for subscribers::Model {
    fn into_subscriber(self) -> Result<Subscriber> {
        let product = match (
            self.product_plan_id,
            self.product_subscription_id,
            self.product_status,
        ) {
            (Some(plan_id), Some(subscription_id), Some(status)) => Some(Product {
                plan_id,
                subscription_id,
                status: ProductStatus::from(status),
            }),
            _ => None,
        };

        let transaction = self
            .transaction
            .map(serde_json::from_value::<Transaction>)
            .transpose()
            .with_context(|| format!("stored transaction of subscriber {} is malformed", self.id))
            .map_err(ApiError::Internal)?;

        Ok(Subscriber {
            id: self.id,
            user_id: self.user_id,
            country: self.country,
            status: self.status,
            product,
            transaction,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Write every document field of `record` onto `model`
pub fn apply_record(model: &mut subscribers::ActiveModel, record: &SubscriberRecord) -> Result<()> {
    let transaction = record
        .transaction
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .context("failed to serialize transaction")
        .map_err(ApiError::Internal)?;

    model.user_id = Set(record.user_id.clone());
    model.country = Set(record.country.clone());
    model.status = Set(record.status.clone());
    model.product_plan_id = Set(record.product.as_ref().map(|p| p.plan_id.clone()));
    model.product_subscription_id =
        Set(record.product.as_ref().map(|p| p.subscription_id.clone()));
    model.product_status = Set(record
        .product
        .as_ref()
        .map(|p| p.status.as_str().to_string()));
    model.transaction = Set(transaction);
    Ok(())
}
