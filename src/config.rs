use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Application package the subscriptions belong to (e.g. com.example.app)
    pub package_name: String,
    /// Google service-account key file (JSON), read on every verification
    pub service_account_key_path: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Days after expiry during which the store keeps retrying the charge
    #[serde(default = "default_billing_retry_days")]
    pub billing_retry_days: i64,
    /// Reject unless the authority answers 200 *and* the purchase is acknowledged.
    /// Off by default: only a response failing both is rejected.
    #[serde(default)]
    pub require_acknowledgement: bool,
    /// No timeout when unset
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_api_base() -> String {
    "https://androidpublisher.googleapis.com".to_string()
}

fn default_billing_retry_days() -> i64 {
    14
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("SUBSCRIBERS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
