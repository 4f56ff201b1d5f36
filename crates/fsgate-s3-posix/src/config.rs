//! Engine configuration.
//!
//! Provides [`PosixConfig`] for configuring a [`crate::PosixBackend`]
//! instance. Every knob lives on the instance; there are no process-global
//! settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default IAM cache time-to-live, in seconds.
const DEFAULT_IAM_CACHE_TTL_SECS: u64 = 300;

/// POSIX backend configuration.
///
/// # Examples
///
/// ```
/// use fsgate_s3_posix::config::PosixConfig;
///
/// let config = PosixConfig::default();
/// assert_eq!(config.iam_cache_ttl_secs, 300);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct PosixConfig {
    /// Root directory holding the buckets.
    #[builder(default = String::from("/var/lib/fsgate"))]
    pub root: String,

    /// IAM cache time-to-live in seconds.
    #[builder(default = DEFAULT_IAM_CACHE_TTL_SECS)]
    pub iam_cache_ttl_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for PosixConfig {
    fn default() -> Self {
        Self {
            root: String::from("/var/lib/fsgate"),
            iam_cache_ttl_secs: DEFAULT_IAM_CACHE_TTL_SECS,
            log_level: String::from("info"),
        }
    }
}

impl PosixConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FSGATE_ROOT` | `/var/lib/fsgate` |
    /// | `FSGATE_IAM_CACHE_TTL_SECS` | `300` |
    /// | `FSGATE_LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("FSGATE_ROOT") {
            config.root = v;
        }
        if let Ok(v) = std::env::var("FSGATE_IAM_CACHE_TTL_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.iam_cache_ttl_secs = n;
            }
        }
        if let Ok(v) = std::env::var("FSGATE_LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The IAM cache TTL as a [`Duration`].
    #[must_use]
    pub fn iam_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.iam_cache_ttl_secs)
    }
}
