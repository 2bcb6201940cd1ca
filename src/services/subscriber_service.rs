use entity::subscribers;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::{
        subscriber::{Subscriber, SubscriberRecord},
        subscriber_ext::{apply_record, SubscriberModelExt},
        transaction::Transaction,
    },
    services::validation_service::SubscriptionValidator,
};

/// Subscriber persistence. Every write goes through the validation hooks
/// first; a rejected record is never written.
pub struct SubscriberService {
    db: DatabaseConnection,
    validator: Arc<SubscriptionValidator>,
}

impl SubscriberService {
    pub fn new(db: DatabaseConnection, validator: Arc<SubscriptionValidator>) -> Self {
        Self { db, validator }
    }

    /// Validate and insert a new subscriber
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    pub async fn create(&self, mut record: SubscriberRecord) -> Result<Subscriber> {
        self.validator.validate(&mut record).await?;

        let now = time::OffsetDateTime::now_utc();
        let mut model = subscribers::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_record(&mut model, &record)?;

        let inserted = model.insert(&self.db).await?;

        info!(subscriber_id = %inserted.id, "Created subscriber");

        inserted.into_subscriber()
    }

    #[instrument(skip(self))]
    pub async fn get_by_user_id(&self, user_id: &str) -> Result<Subscriber> {
        subscribers::Entity::find()
            .filter(subscribers::Column::UserId.eq(user_id.trim()))
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Subscriber for user {} not found", user_id)))?
            .into_subscriber()
    }

    /// Replace the whole document of an existing subscriber
    #[instrument(skip(self, record))]
    pub async fn update(&self, id: Uuid, mut record: SubscriberRecord) -> Result<Subscriber> {
        let existing = self.find_model(id).await?;

        self.validator.validate(&mut record).await?;

        self.write(existing, &record).await
    }

    /// Overwrite the transaction snapshot and re-validate the subscriber
    #[instrument(skip(self, transaction))]
    pub async fn replace_transaction(
        &self,
        id: Uuid,
        transaction: Transaction,
    ) -> Result<Subscriber> {
        let existing = self.find_model(id).await?;

        let mut record = existing.clone().into_subscriber()?.to_record();
        record.transaction = Some(transaction);
        self.validator.validate(&mut record).await?;

        self.write(existing, &record).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = subscribers::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(format!("Subscriber {} not found", id)));
        }

        info!(subscriber_id = %id, "Deleted subscriber");
        Ok(())
    }

    async fn find_model(&self, id: Uuid) -> Result<subscribers::Model> {
        subscribers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Subscriber {} not found", id)))
    }

    async fn write(
        &self,
        existing: subscribers::Model,
        record: &SubscriberRecord,
    ) -> Result<Subscriber> {
        let mut model: subscribers::ActiveModel = existing.into();
        apply_record(&mut model, record)?;
        model.updated_at = Set(time::OffsetDateTime::now_utc());

        let updated = model.update(&self.db).await?;

        info!(subscriber_id = %updated.id, "Updated subscriber");

        updated.into_subscriber()
    }
}
