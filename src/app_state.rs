use crate::{
    config::Config,
    services::{BillingClient, GooglePlayClient, SubscriberService, SubscriptionValidator},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub subscriber_service: Arc<SubscriberService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        let billing: Arc<dyn BillingClient> = Arc::new(GooglePlayClient::from_config(&config.billing)?);

        Ok(Self::with_billing(db, billing, config))
    }

    /// Assemble the state around an existing connection and billing client
    pub fn with_billing(
        db: DatabaseConnection,
        billing: Arc<dyn BillingClient>,
        config: Config,
    ) -> Self {
        let validator = Arc::new(SubscriptionValidator::new(billing, &config.billing));
        let subscriber_service = Arc::new(SubscriberService::new(db.clone(), validator));

        Self {
            db,
            subscriber_service,
            config: Arc::new(config),
        }
    }
}
