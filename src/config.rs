//! Configuration for the notifier.
//!
//! Settings are merged with `figment`: built-in defaults, then a
//! `lognotify.toml` file, then `LOGNOTIFY_*` environment variables.
//! Validation of the trigger level and flush interval happens at notifier
//! construction so configuration mistakes fail fast with a typed error.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "Script Notifications";
pub const DEFAULT_FLUSH_INTERVAL_SECONDS: f64 = 3600.0;
pub const DEFAULT_RECURSION_DEPTH: usize = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid trigger level '{0}': not a recognized level name")]
    InvalidLevelName(String),

    #[error("flush interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("failed to start flush loop: {0}")]
    FlushThread(#[from] std::io::Error),
}

/// Construction parameters for [`crate::Notifier`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifierConfig {
    /// Minimum severity (level name) required for a record to be buffered.
    pub trigger_level: String,
    /// Period of the background flush loop, in seconds.
    pub flush_interval_seconds: f64,
    /// How many levels of `include` directives destination-config discovery
    /// follows. Not used by the core logic itself.
    pub recursion_depth: usize,
    /// Title attached to every batched notification.
    pub title: String,
    /// Destination URLs added at construction.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Extra destination-config files loaded after the default paths.
    #[serde(default)]
    pub config_paths: Vec<PathBuf>,
    /// Re-invoke the panic hook found installed before ours. Off by
    /// default: the hook captured first is normally the runtime default,
    /// and the panic has already been re-logged by then.
    #[serde(default)]
    pub chain_panic_hook: bool,
    /// HTTP request timeout for webhook channels, in seconds.
    pub request_timeout_seconds: u64,
    /// Probe the default destination-config paths at construction.
    #[serde(default = "default_true")]
    pub load_default_config: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            trigger_level: "ERROR".to_string(),
            flush_interval_seconds: DEFAULT_FLUSH_INTERVAL_SECONDS,
            recursion_depth: DEFAULT_RECURSION_DEPTH,
            title: DEFAULT_TITLE.to_string(),
            urls: Vec::new(),
            config_paths: Vec::new(),
            chain_panic_hook: false,
            request_timeout_seconds: 10,
            load_default_config: true,
        }
    }
}

impl NotifierConfig {
    /// Loads configuration from `lognotify.toml` and the environment,
    /// layered over the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file("lognotify.toml"))
                .merge(Env::prefixed("LOGNOTIFY_")),
        )
    }

    /// Extracts a config from an arbitrary figment; exposed for tests and
    /// embedders that layer their own providers.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let config = NotifierConfig::default();
        assert_eq!(config.trigger_level, "ERROR");
        assert_eq!(config.flush_interval_seconds, 3600.0);
        assert_eq!(config.recursion_depth, 1);
        assert_eq!(config.title, DEFAULT_TITLE);
        assert!(!config.chain_panic_hook);
    }

    #[test]
    fn figment_layers_override_defaults() {
        let figment = Figment::from(Serialized::defaults(NotifierConfig::default())).merge(
            Toml::string(
                r#"
                trigger_level = "WARNING"
                flush_interval_seconds = 60.0
                urls = ["https://example.com/hook"]
                "#,
            ),
        );
        let config = NotifierConfig::from_figment(figment).unwrap();
        assert_eq!(config.trigger_level, "WARNING");
        assert_eq!(config.flush_interval_seconds, 60.0);
        assert_eq!(config.urls, vec!["https://example.com/hook".to_string()]);
        // Untouched fields keep their defaults.
        assert_eq!(config.title, DEFAULT_TITLE);
    }
}
