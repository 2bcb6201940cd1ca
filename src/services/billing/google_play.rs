use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

use super::{
    credentials::{ServiceAccountTokenSource, TokenSource},
    BillingClient, BillingError, PurchaseStatus,
};
use crate::config::BillingConfig;

/// Google Play Developer API client for `purchases.subscriptions.get`
pub struct GooglePlayClient {
    api_base: Url,
    http_client: reqwest::Client,
    token_source: Arc<dyn TokenSource>,
}

/// Subset of the SubscriptionPurchase resource we read, plus the error
/// envelope Google returns on failures.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionPurchaseBody {
    acknowledgement_state: Option<i32>,
    expiry_time_millis: Option<Millis>,
    error: Option<GoogleErrorBody>,
}

/// int64 fields come back as JSON strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Millis {
    Text(String),
    Number(i64),
}

impl Millis {
    fn value(&self) -> Result<i64, BillingError> {
        match self {
            Millis::Number(n) => Ok(*n),
            Millis::Text(s) => s.trim().parse::<i64>().map_err(|e| {
                BillingError::MalformedResponse(format!("expiryTimeMillis {:?}: {}", s, e))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Value>,
}

impl GooglePlayClient {
    pub fn new(
        api_base: &str,
        http_client: reqwest::Client,
        token_source: Arc<dyn TokenSource>,
    ) -> Result<Self, BillingError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| BillingError::Configuration(format!("invalid api base: {}", e)))?;

        Ok(Self {
            api_base,
            http_client,
            token_source,
        })
    }

    /// Client authenticating with the configured service-account key
    pub fn from_config(config: &BillingConfig) -> Result<Self, BillingError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let http_client = builder.build()?;

        let token_source = Arc::new(ServiceAccountTokenSource::new(
            &config.service_account_key_path,
            http_client.clone(),
        ));

        Self::new(&config.api_base, http_client, token_source)
    }

    fn subscription_url(
        &self,
        package_name: &str,
        subscription_id: &str,
        purchase_token: &str,
    ) -> Result<Url, BillingError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| BillingError::Configuration("api base cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "androidpublisher",
                "v3",
                "applications",
                package_name,
                "purchases",
                "subscriptions",
                subscription_id,
                "tokens",
                purchase_token,
            ]);
        Ok(url)
    }
}

#[async_trait]
impl BillingClient for GooglePlayClient {
    #[instrument(skip(self, purchase_token))]
    async fn get_subscription_purchase(
        &self,
        package_name: &str,
        subscription_id: &str,
        purchase_token: &str,
    ) -> Result<PurchaseStatus, BillingError> {
        let token = self.token_source.access_token().await?;
        let url = self.subscription_url(package_name, subscription_id, purchase_token)?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token.0)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(BillingError::MalformedResponse(format!(
                "empty body with status {}",
                status
            )));
        }

        let body: SubscriptionPurchaseBody = serde_json::from_slice(&bytes)
            .map_err(|e| BillingError::MalformedResponse(e.to_string()))?;

        let expiry_time_millis = body
            .expiry_time_millis
            .as_ref()
            .map(Millis::value)
            .transpose()?;

        let errors = body.error.map(|e| match e.errors {
            Some(errors) => errors,
            None => Value::String(e.message.unwrap_or_default()),
        });

        debug!(
            status,
            acknowledgement_state = ?body.acknowledgement_state,
            expiry_time_millis = ?expiry_time_millis,
            "Billing authority answered"
        );

        Ok(PurchaseStatus {
            status,
            acknowledgement_state: body.acknowledgement_state,
            expiry_time_millis,
            errors,
        })
    }
}
