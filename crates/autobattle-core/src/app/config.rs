//! Session configuration and loop timing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Options recognised by a session.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Battles before the session completes; -1 means unlimited.
    pub max_battles: i64,
    /// Failed cycles per session before giving up. Separate from the fixed
    /// threshold of 3 consecutive failures.
    pub max_errors: u32,
    /// Delay between cycles.
    pub screenshot_interval_ms: u64,
    /// Upper bound on perceive + decide for a command screen.
    pub decision_timeout_ms: u64,
    /// Keep the decision history.
    pub enable_learning: bool,
    /// Run `ErrorRecovery` routines; when off they are logged and skipped.
    pub enable_recovery: bool,
    /// Add random jitter to every delay issued to the actuation port.
    pub human_like_timing: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            max_battles: -1,
            max_errors: 5,
            screenshot_interval_ms: 100,
            decision_timeout_ms: 5000,
            enable_learning: true,
            enable_recovery: true,
            human_like_timing: false,
        }
    }
}

impl AutomationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_battles < -1 {
            return Err(ConfigError::Invalid(format!(
                "max_battles must be -1 (unlimited) or >= 0, got {}",
                self.max_battles
            )));
        }
        if self.max_errors == 0 {
            return Err(ConfigError::Invalid("max_errors must be >= 1".to_string()));
        }
        if self.decision_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "decision_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `None` when unlimited.
    pub fn battle_limit(&self) -> Option<u64> {
        u64::try_from(self.max_battles).ok()
    }

    pub fn screenshot_interval(&self) -> Duration {
        Duration::from_millis(self.screenshot_interval_ms)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }
}

/// Fixed delays inside the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopTiming {
    /// Sleep between state checks while paused.
    pub pause_poll: Duration,
    /// Sleep after a failed cycle.
    pub error_backoff: Duration,
    /// Quest selection, support selection and battle start screens.
    pub transition_wait: Duration,
    /// Skill and NP menus.
    pub menu_wait: Duration,
    /// Unrecognised screens.
    pub unknown_wait: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            pause_poll: Duration::from_millis(100),
            error_backoff: Duration::from_millis(5000),
            transition_wait: Duration::from_millis(1500),
            menu_wait: Duration::from_millis(1000),
            unknown_wait: Duration::from_millis(1000),
        }
    }
}

impl LoopTiming {
    /// Every delay set to `d`; handy for tests and simulations.
    pub fn uniform(d: Duration) -> Self {
        Self {
            pause_poll: d,
            error_backoff: d,
            transition_wait: d,
            menu_wait: d,
            unknown_wait: d,
        }
    }
}
