//! Server Configuration
//!
//! Layered: an optional config file, then `OBD_DASHBOARD_*` environment
//! variables with `__` separating nested keys, e.g.
//! `OBD_DASHBOARD_SESSION__USE_MOCK_MODE=true`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use obd_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "OBD_DASHBOARD_CONFIG";

/// Config file looked up when `OBD_DASHBOARD_CONFIG` is unset (any extension)
pub const DEFAULT_CONFIG_FILE: &str = "obd-dashboard";

const ENV_PREFIX: &str = "OBD_DASHBOARD";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Top-level configuration for the dashboard server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Socket address to listen on
    pub listen_addr: String,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    pub log_format: LogFormat,
    /// Ports offered in mock mode when no adapter library is attached
    pub mock_ports: Vec<String>,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            mock_ports: vec!["SIMULATED".to_string()],
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the config file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_builder(Config::builder().add_source(File::with_name(&path).required(false)))
    }

    /// Apply the environment layer on top of `builder` and deserialize
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("mock_ports")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
