//! Configuration loading and management.
//!
//! Configuration is loaded with the following precedence:
//! 1. Environment variables (`CARTPULSE_*`)
//! 2. Config file (`~/.cartpulse/config.toml`)
//! 3. Defaults

use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,

    /// Collector (flush target) configuration.
    pub collector: CollectorConfig,

    /// Flush triggers.
    pub flush: FlushConfig,

    /// Decision service configuration.
    pub decision: DecisionConfig,

    /// Cart endpoint configuration.
    pub cart: CartConfig,

    /// Visible-time accounting.
    pub visibility: VisibilityConfig,

    /// Navigation signal handling.
    pub navigation: NavigationConfig,

    /// Context stamped onto every event.
    pub agent: AgentConfig,
}

impl Config {
    /// Reject settings the agent cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first timer period that is zero.
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("flush.interval_ms", self.flush.interval_ms),
            ("decision.interval_ms", self.decision.interval_ms),
            ("visibility.heartbeat_ms", self.visibility.heartbeat_ms),
        ];
        for (name, ms) in periods {
            if ms == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the cartpulse home directory.
    pub path: PathBuf,

    /// Fixed key the session record is stored under.
    pub key: String,

    /// Byte ceiling for the serialized record. `None` means unlimited.
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_cartpulse_home(),
            key: "cartpulse_session".to_string(),
            quota_bytes: None,
        }
    }
}

/// Collector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Collector base URL.
    pub base_url: String,

    /// Ingest path appended to `base_url`.
    pub path: String,

    /// Truncate buffered events after a successful flush.
    pub clear_after_send: bool,
}

impl CollectorConfig {
    /// Full ingest endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        join_url(&self.base_url, &self.path)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/collect".to_string(),
            clear_after_send: true,
        }
    }
}

/// Flush trigger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Cadence of the timer-driven flush.
    pub interval_ms: u64,

    /// Buffered event count that forces a flush.
    pub threshold: usize,

    /// How long the unload flush may hold up teardown.
    pub unload_grace_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            threshold: 150,
            unload_grace_ms: 300,
        }
    }
}

/// Decision service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Decision service base URL.
    pub base_url: String,

    /// Evaluate path appended to `base_url`.
    pub path: String,

    /// Cadence of decision checks.
    pub interval_ms: u64,

    /// Delay of the one-off check after load.
    pub boot_delay_ms: u64,

    /// Cooldown used when the service does not send one.
    pub default_cooldown_ms: i64,
}

impl DecisionConfig {
    /// Full evaluate endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        join_url(&self.base_url, &self.path)
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/evaluate".to_string(),
            interval_ms: 20_000,
            boot_delay_ms: 1_500,
            default_cooldown_ms: 180_000,
        }
    }
}

/// Cart endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Same-origin cart endpoint.
    pub url: String,

    /// Delay before refreshing after an add-to-cart click.
    pub refresh_delay_ms: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/cart.js".to_string(),
            refresh_delay_ms: 800,
        }
    }
}

/// Visible-time configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Heartbeat accrual cadence while visible.
    pub heartbeat_ms: u64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 300_000,
        }
    }
}

/// Navigation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Window in which a repeat signal for the same URL is dropped.
    pub dedupe_window_ms: i64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            dedupe_window_ms: 50,
        }
    }
}

/// Agent identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// User-agent string stamped on every event.
    pub user_agent: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("cartpulse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Get the default cartpulse home directory.
fn default_cartpulse_home() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(".cartpulse"), |h| h.join(".cartpulse"))
}

/// Load configuration with precedence: env vars → file → defaults.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// a timer period is zero.
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let config_path = get_config_path();
    if config_path.exists() {
        let contents = fs::read_to_string(&config_path).map_err(Error::Storage)?;
        config = toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))?;
    }

    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// Get the path to the config file.
fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("CARTPULSE_CONFIG") {
        return PathBuf::from(path);
    }

    if let Ok(home) = env::var("CARTPULSE_HOME") {
        return PathBuf::from(home).join("config.toml");
    }

    default_cartpulse_home().join("config.toml")
}

/// Apply environment variable overrides to config.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(path) = env::var("CARTPULSE_STORAGE_PATH") {
        config.storage.path = PathBuf::from(path);
    } else if let Ok(home) = env::var("CARTPULSE_HOME") {
        config.storage.path = PathBuf::from(home);
    }

    if let Ok(url) = env::var("CARTPULSE_COLLECTOR_URL") {
        config.collector.base_url = url;
    }

    if let Ok(url) = env::var("CARTPULSE_DECISION_URL") {
        config.decision.base_url = url;
    }

    if let Ok(url) = env::var("CARTPULSE_CART_URL") {
        config.cart.url = url;
    }

    if let Ok(val) = env::var("CARTPULSE_FLUSH_THRESHOLD") {
        if let Ok(threshold) = val.parse() {
            config.flush.threshold = threshold;
        }
    }

    if let Ok(val) = env::var("CARTPULSE_COOLDOWN_MS") {
        if let Ok(ms) = val.parse() {
            config.decision.default_cooldown_ms = ms;
        }
    }

    if let Ok(val) = env::var("CARTPULSE_CLEAR_AFTER_SEND") {
        config.collector.clear_after_send =
            matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
    }
}
