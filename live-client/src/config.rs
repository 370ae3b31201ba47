//! Configuration loading for livewatch.
//!
//! Configuration is loaded from a TOML file (default: `livewatch.toml`).
//! Every section and every key is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use livewatch_core::{
    SyncPolicy, DEFAULT_BUFFER_CAPACITY, DEFAULT_DISMISS_AFTER, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL,
};

use crate::transport::{DEFAULT_HEALTH_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};

/// Root configuration for livewatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LiveConfig {
    /// Sync controller configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Notification configuration.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Events API configuration.
    #[serde(default)]
    pub api: ApiConfig,
}

/// Sync controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Whether polling starts enabled (default: true).
    #[serde(default = "default_initial_enabled")]
    pub initial_enabled: bool,
    /// Seconds between polls (default: 10).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Consecutive failures before backoff (default: 3).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Events requested per poll (default: 200).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Events retained in memory (default: 500).
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    /// Notifications held at once (default: 5).
    #[serde(default = "default_notification_capacity")]
    pub capacity: usize,
    /// Seconds before a notification removes itself (default: 5).
    #[serde(default = "default_dismiss_after_secs")]
    pub dismiss_after_secs: u64,
}

/// Events API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `/events` and `/health` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for one events request in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for a health probe in milliseconds (default: 3000).
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
}

// Default value functions
fn default_initial_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}

fn default_dismiss_after_secs() -> u64 {
    DEFAULT_DISMISS_AFTER.as_secs()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_health_timeout_ms() -> u64 {
    DEFAULT_HEALTH_TIMEOUT.as_millis() as u64
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            initial_enabled: default_initial_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
            failure_threshold: default_failure_threshold(),
            page_size: default_page_size(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            capacity: default_notification_capacity(),
            dismiss_after_secs: default_dismiss_after_secs(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            health_timeout_ms: default_health_timeout_ms(),
        }
    }
}

impl LiveConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.sync.page_size == 0 {
            return Err(ConfigError::Invalid("sync.page_size must be at least 1".into()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Controller policy described by the `[sync]` section.
    pub fn policy(&self) -> SyncPolicy {
        SyncPolicy::default()
            .with_initial_enabled(self.sync.initial_enabled)
            .with_poll_interval(Duration::from_secs(self.sync.poll_interval_secs))
            .with_failure_threshold(self.sync.failure_threshold)
            .with_page_size(self.sync.page_size)
            .with_buffer_capacity(self.sync.buffer_capacity)
    }
}

impl NotificationConfig {
    /// Delay before a notification removes itself.
    pub fn dismiss_after(&self) -> Duration {
        Duration::from_secs(self.dismiss_after_secs)
    }
}

impl ApiConfig {
    /// Timeout for one events request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for a health probe.
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_reference_values() {
        let config = LiveConfig::default();
        assert!(config.sync.initial_enabled);
        assert_eq!(config.sync.poll_interval_secs, 10);
        assert_eq!(config.sync.failure_threshold, 3);
        assert_eq!(config.sync.page_size, 200);
        assert_eq!(config.sync.buffer_capacity, 500);
        assert_eq!(config.notifications.capacity, 5);
        assert_eq!(config.notifications.dismiss_after(), Duration::from_secs(5));
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.api.health_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[sync]
initial_enabled = false
poll_interval_secs = 30
failure_threshold = 5

[notifications]
dismiss_after_secs = 8

[api]
base_url = "https://hunt.example.org/api"
health_timeout_ms = 500
"#;

        let config: LiveConfig = toml::from_str(toml).unwrap();
        assert!(!config.sync.initial_enabled);
        assert_eq!(config.sync.poll_interval_secs, 30);
        assert_eq!(config.sync.failure_threshold, 5);
        assert_eq!(config.sync.page_size, 200);
        assert_eq!(config.notifications.dismiss_after_secs, 8);
        assert_eq!(config.notifications.capacity, 5);
        assert_eq!(config.api.base_url, "https://hunt.example.org/api");
        assert_eq!(config.api.health_timeout(), Duration::from_millis(500));
        assert_eq!(config.api.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: LiveConfig = toml::from_str("").unwrap();
        assert_eq!(config, LiveConfig::default());
    }

    #[test]
    fn policy_follows_sync_section() {
        let toml = r#"
[sync]
poll_interval_secs = 2
failure_threshold = 0
buffer_capacity = 50
"#;
        let config: LiveConfig = toml::from_str(toml).unwrap();
        let policy = config.policy();

        assert_eq!(policy.poll_interval, Duration::from_secs(2));
        assert_eq!(policy.failure_threshold, 1);
        assert_eq!(policy.buffer_capacity, 50);
        assert_eq!(policy.page_size, 200);
        assert!(policy.initial_enabled);
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\npage_size = 50").unwrap();

        let config = LiveConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sync.page_size, 50);
    }

    #[test]
    fn from_file_rejects_zero_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\npoll_interval_secs = 0").unwrap();

        let result = LiveConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync\npage_size = ").unwrap();

        let result = LiveConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = LiveConfig::from_file(Path::new("/nonexistent/livewatch.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let toml = r#"
[api]
base_url = "http://localhost:9000"
retries = 4
"#;
        let config: LiveConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
    }
}
