use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub mpesa: MpesaConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    pub email: Option<EmailConfig>,
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
pub struct AuthConfig {
    pub admin_token: String,
}

/// Daraja (M-Pesa) gateway settings. The five credentials are optional here
/// and only resolved when a push is initiated, see `MpesaCredentials`.
#[derive(Debug, Deserialize, Clone)]
pub struct MpesaConfig {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub business_short_code: Option<String>,
    pub passkey: Option<String>,
    pub callback_url: Option<String>,
    #[serde(default = "default_mpesa_base_url")]
    pub base_url: String,
    #[serde(default = "default_mpesa_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    #[serde(default = "default_overdue_grace_minutes")]
    pub overdue_grace_minutes: i64,
    /// Zero disables the in-process sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

fn default_mpesa_base_url() -> String {
    "https://sandbox.safaricom.co.ke".to_string()
}

fn default_mpesa_timeout_secs() -> u64 {
    30
}

fn default_currency() -> String {
    "KES".to_string()
}

fn default_overdue_grace_minutes() -> i64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            consumer_key: None,
            consumer_secret: None,
            business_short_code: None,
            passkey: None,
            callback_url: None,
            base_url: default_mpesa_base_url(),
            timeout_secs: default_mpesa_timeout_secs(),
            currency: default_currency(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            overdue_grace_minutes: default_overdue_grace_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://teketeke.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.admin_token", "change-me-in-production")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Environment variables: TEKETEKE__MPESA__CONSUMER_KEY etc.
            .add_source(Environment::with_prefix("TEKETEKE").separator("__"))

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
                url: "sqlite://teketeke.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                admin_token: "change-me-in-production".to_string(),
            },
            mpesa: MpesaConfig::default(),
            billing: BillingConfig::default(),
            email: None,
        }
    }
}
