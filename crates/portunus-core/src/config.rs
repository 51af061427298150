//! Runtime configuration.
//!
//! Every section has defaults matching the shipped firmware, so an empty file
//! (or no file at all) yields a working configuration:
//!
//! ```
//! use portunus_core::SystemConfig;
//!
//! let config = SystemConfig::from_toml_str(
//!     r#"
//!     [reader]
//!     dedupe_window_ms = 1500
//!
//!     [policy]
//!     unlock_duration_ms = 5000
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.reader.dedupe_window_ms, 1500);
//! assert_eq!(config.policy.unlock_duration_ms, 5000);
//! assert_eq!(config.bus.queue_length, 16);
//! ```

use crate::{Result, constants::*, error::Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Card reader polling parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub poll_interval_ms: u64,
    pub dedupe_window_ms: u64,
    pub reread_delay_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            dedupe_window_ms: DEFAULT_DEDUPE_WINDOW_MS,
            reread_delay_ms: DEFAULT_REREAD_DELAY_MS,
        }
    }
}

impl ReaderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dedupe_window(&self) -> Duration {
        Duration::from_millis(self.dedupe_window_ms)
    }

    pub fn reread_delay(&self) -> Duration {
        Duration::from_millis(self.reread_delay_ms)
    }
}

/// Event bus sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub queue_length: usize,
    pub publish_timeout_ms: u64,
    pub max_subscribers: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_length: DEFAULT_EVENT_QUEUE_LENGTH,
            publish_timeout_ms: DEFAULT_EVENT_QUEUE_TIMEOUT_MS,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
        }
    }
}

impl BusConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

/// Local access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub unlock_duration_ms: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            unlock_duration_ms: DEFAULT_UNLOCK_DURATION_MS,
        }
    }
}

/// Door sensor monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_DOOR_POLL_INTERVAL_MS,
        }
    }
}

impl DoorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Connectivity monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub poll_interval_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_CONNECTIVITY_POLL_INTERVAL_MS,
        }
    }
}

impl ConnectivityConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub module_id: String,
    pub heartbeat_interval_ms: u64,
    pub queue_length: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            module_id: DEFAULT_MODULE_ID.to_string(),
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            queue_length: DEFAULT_REPORT_QUEUE_LENGTH,
        }
    }
}

impl ReportingConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Complete endpoint configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub reader: ReaderConfig,
    pub bus: BusConfig,
    pub policy: PolicyConfig,
    pub door: DoorConfig,
    pub connectivity: ConnectivityConfig,
    pub reporting: ReportingConfig,
}

impl SystemConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` on malformed TOML or on values
    /// rejected by [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::InvalidArgument(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidArgument(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, bool); 7] = [
            ("bus.queue_length", self.bus.queue_length > 0),
            ("bus.max_subscribers", self.bus.max_subscribers > 0),
            ("reader.poll_interval_ms", self.reader.poll_interval_ms > 0),
            ("door.poll_interval_ms", self.door.poll_interval_ms > 0),
            (
                "connectivity.poll_interval_ms",
                self.connectivity.poll_interval_ms > 0,
            ),
            (
                "reporting.heartbeat_interval_ms",
                self.reporting.heartbeat_interval_ms > 0,
            ),
            ("reporting.queue_length", self.reporting.queue_length > 0),
        ];

        for (field, ok) in checks {
            if !ok {
                return Err(Error::InvalidArgument(format!("{field} must be non-zero")));
            }
        }

        if self.reporting.module_id.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "reporting.module_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.unlock_duration_ms, 3_000);
        assert_eq!(config.reader.dedupe_window(), Duration::from_secs(2));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SystemConfig::from_toml_str("").unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_zero_queue_rejected() {
        let err = SystemConfig::from_toml_str("[bus]\nqueue_length = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("bus.queue_length")));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(SystemConfig::from_toml_str("[reader\n").is_err());
        assert!(SystemConfig::from_toml_str("[reader]\npoll_interval_ms = \"fast\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reporting]\nmodule_id = \"lobby\"").unwrap();

        let config = SystemConfig::load(file.path()).unwrap();
        assert_eq!(config.reporting.module_id, "lobby");
        assert!(SystemConfig::load("/nonexistent/portunus.toml").is_err());
    }
}
