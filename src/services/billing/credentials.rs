use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::BillingError;

/// OAuth scope for reading subscription purchases
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for the signed assertion (Google caps it at 1 hour)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Bearer token for one billing call
#[derive(Clone)]
pub struct AccessToken(pub String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, BillingError>;
}

/// Fields of a Google service-account key file we need
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Claims of the JWT bearer assertion
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(key: &ServiceAccountKey, scope: &str, now: OffsetDateTime) -> Self {
        let iat = now.unix_timestamp();
        Self {
            iss: key.client_email.clone(),
            scope: scope.to_string(),
            aud: key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Mints a scoped access token from a service-account key file.
///
/// Nothing is cached: the key file is read and a new token exchanged on
/// every call.
pub struct ServiceAccountTokenSource {
    key_path: PathBuf,
    scope: String,
    http_client: reqwest::Client,
}

impl ServiceAccountTokenSource {
    pub fn new(key_path: impl Into<PathBuf>, http_client: reqwest::Client) -> Self {
        Self {
            key_path: key_path.into(),
            scope: ANDROID_PUBLISHER_SCOPE.to_string(),
            http_client,
        }
    }

    pub async fn load_key(&self) -> Result<ServiceAccountKey, BillingError> {
        let raw = tokio::fs::read_to_string(&self.key_path)
            .await
            .map_err(|e| {
                BillingError::Credentials(format!("{}: {}", self.key_path.display(), e))
            })?;

        serde_json::from_str(&raw)
            .map_err(|e| BillingError::Credentials(format!("invalid key file: {}", e)))
    }

    fn sign_assertion(&self, key: &ServiceAccountKey) -> Result<String, BillingError> {
        let claims = AssertionClaims::new(key, &self.scope, OffsetDateTime::now_utc());
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| BillingError::Credentials(format!("invalid private key: {}", e)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| BillingError::Credentials(format!("failed to sign assertion: {}", e)))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    #[instrument(skip(self), fields(key_path = %self.key_path.display()))]
    async fn access_token(&self) -> Result<AccessToken, BillingError> {
        let key = self.load_key().await?;
        let assertion = self.sign_assertion(&key)?;

        let response = self
            .http_client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BillingError::Auth(format!("invalid token response: {}", e)))?;

        debug!(client_email = %key.client_email, "Obtained billing access token");

        Ok(AccessToken(token.access_token))
    }
}
