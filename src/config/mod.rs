use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    /// Settlement currency for all weddings (single-currency system).
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Upper bound on any single processor call. Checkout-session creation
    /// is not safe to blindly retry, so on timeout we fail closed and log
    /// the attempt for manual reconciliation.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub fee: FeePolicy,
}

/// Platform fee applied on the card rail, versioned so a policy change is a
/// config rollout rather than a code change.
#[derive(Debug, Deserialize, Clone)]
pub struct FeePolicy {
    pub version: u32,
    /// Fraction of the contribution amount, e.g. 0.10 for 10%.
    pub percent: f64,
    /// Flat fee in major currency units (SEK), added on top of the percent.
    pub fixed: f64,
}

fn default_currency() -> String {
    "sek".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            version: 1,
            percent: 0.10,
            fixed: 5.0,
        }
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            enabled: false,
            currency: default_currency(),
            request_timeout_secs: default_request_timeout_secs(),
            fee: FeePolicy::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("stripe.enabled", false)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with GAVOBORD__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("GAVOBORD").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://gavobord.db".to_string(),
                max_connections: 10,
            },
            stripe: StripeConfig::default(),
        }
    }
}
