//! Lock table configuration.

use crate::error::{LockError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a [`RangeLockTable`](crate::table::RangeLockTable).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeLockConfig {
    /// Report releases of ranges that are not held as `NoSuchLock` instead
    /// of ignoring them.
    pub strict_release: bool,
    /// Upper bound on how long `acquire_read`/`acquire_write` wait.
    /// `None` waits until the conflicting holders release.
    pub wait_timeout: Option<Duration>,
}

impl RangeLockConfig {
    pub fn strict() -> Self {
        Self {
            strict_release: true,
            ..Self::default()
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait_timeout == Some(Duration::ZERO) {
            return Err(LockError::Config {
                msg: "wait_timeout must be non-zero; use try_acquire for non-blocking locks"
                    .to_string(),
            });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
