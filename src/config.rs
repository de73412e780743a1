use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BROKERAGE_URL: &str = "https://api.coinbase.com/api/v3/brokerage";
pub const DEFAULT_TOKEN_SERVICE: &str = "retail_rest_api_proxy";
pub const DEFAULT_TOKEN_ISSUER: &str = "coinbase-cloud";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub brokerage: BrokerageConfig,
    pub state: StateConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the local service binds to
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Base URL the CLI uses to reach the local service
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerageConfig {
    /// REST root, e.g. https://api.coinbase.com/api/v3/brokerage
    pub base_url: String,
    /// Path to the JSON API key file (name + privateKey)
    pub api_key_path: PathBuf,
    /// Token audience
    #[serde(default = "default_service")]
    pub service: String,
    /// Token issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Fiat used when a portfolio has no cash-equivalent currency
    #[serde(default = "default_fiat_currency")]
    pub fiat_currency: String,
}

fn default_service() -> String {
    DEFAULT_TOKEN_SERVICE.to_string()
}

fn default_issuer() -> String {
    DEFAULT_TOKEN_ISSUER.to_string()
}

fn default_fiat_currency() -> String {
    "GBP".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Location of the single state document
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Send orders to the preview endpoint instead of placing them
    #[serde(default)]
    pub preview: bool,
    /// Upper bound for callers waiting on an execution to complete
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
    /// How long finished execution records stay queryable
    #[serde(default = "default_record_retention")]
    pub record_retention_secs: u64,
}

fn default_wait_timeout() -> u64 {
    30
}

fn default_record_retention() -> u64 {
    3600
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            preview: false,
            wait_timeout_secs: 30,
            record_retention_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rotated log files; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info,hodl=debug".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("brokerage.base_url", DEFAULT_BROKERAGE_URL)?
            .set_default("brokerage.api_key_path", "cdp_api_key.json")?
            .set_default("brokerage.service", DEFAULT_TOKEN_SERVICE)?
            .set_default("brokerage.issuer", DEFAULT_TOKEN_ISSUER)?
            .set_default("brokerage.fiat_currency", "GBP")?
            .set_default("state.path", "data/state/state.json")?
            .set_default("execution.preview", false)?
            .set_default("execution.wait_timeout_secs", 30)?
            .set_default("execution.record_retention_secs", 3600)?
            .set_default("logging.level", "info,hodl=debug")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HODL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // HODL_BROKERAGE__API_KEY_PATH, HODL_SERVER__PORT, ...
            .add_source(
                Environment::with_prefix("HODL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if url::Url::parse(&self.brokerage.base_url).is_err() {
            errors.push(format!(
                "brokerage.base_url is not a valid URL: {}",
                self.brokerage.base_url
            ));
        }

        if self.brokerage.service.trim().is_empty() {
            errors.push("brokerage.service must not be empty".to_string());
        }

        if self.brokerage.fiat_currency.trim().is_empty() {
            errors.push("brokerage.fiat_currency must not be empty".to_string());
        }

        if self.state.path.as_os_str().is_empty() {
            errors.push("state.path must not be empty".to_string());
        }

        if self.execution.wait_timeout_secs == 0 {
            errors.push("execution.wait_timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
