//! # Config - rdbmem settings
//!
//! Every setting comes from an environment variable and falls back to a
//! default when the variable is unset or does not parse:
//!
//! ```text
//! RDBMEM_FILE               snapshot to analyze            (default: "dump.rdb")
//! RDBMEM_CHANNEL_CAP        walker -> aggregator capacity  (default: 4096)
//! RDBMEM_CHECK_INTERVAL_MS  eligibility check spacing, ms  (default: 1000)
//! RDBMEM_LOG                tracing filter directive       (default: "info")
//! RDBMEM_TOP                rows to print, 0 = all         (default: 0)
//! ```
//!
//! Command-line flags override these values in the `rdbmem` binary.

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_FILE: &str = "RDBMEM_FILE";
pub const ENV_CHANNEL_CAP: &str = "RDBMEM_CHANNEL_CAP";
pub const ENV_CHECK_INTERVAL_MS: &str = "RDBMEM_CHECK_INTERVAL_MS";
pub const ENV_LOG: &str = "RDBMEM_LOG";
pub const ENV_TOP: &str = "RDBMEM_TOP";

pub const DEFAULT_FILE: &str = "dump.rdb";
/// Entries buffered between the walker thread and the aggregator.
pub const DEFAULT_CHANNEL_CAP: usize = 4096;
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_LOG: &str = "info";
/// Zero means "print every namespace".
pub const DEFAULT_TOP: usize = 0;

/// Resolved settings for one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub file: PathBuf,
    /// Always at least 1.
    pub channel_capacity: usize,
    pub check_interval: Duration,
    pub log_filter: String,
    pub top: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_FILE),
            channel_capacity: DEFAULT_CHANNEL_CAP,
            check_interval: Duration::from_millis(DEFAULT_CHECK_INTERVAL_MS),
            log_filter: DEFAULT_LOG.to_string(),
            top: DEFAULT_TOP,
        }
    }
}

impl AnalyzerConfig {
    /// Reads the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let file = PathBuf::from(env_or(ENV_FILE, DEFAULT_FILE));
        let channel_capacity = env_or(ENV_CHANNEL_CAP, "")
            .parse::<usize>()
            .ok()
            .filter(|&cap| cap > 0)
            .unwrap_or(DEFAULT_CHANNEL_CAP);
        let check_interval_ms = env_or(ENV_CHECK_INTERVAL_MS, "")
            .parse::<u64>()
            .unwrap_or(DEFAULT_CHECK_INTERVAL_MS);
        let log_filter = env_or(ENV_LOG, DEFAULT_LOG);
        let top = env_or(ENV_TOP, "").parse::<usize>().unwrap_or(DEFAULT_TOP);

        Self {
            file,
            channel_capacity,
            check_interval: Duration::from_millis(check_interval_ms),
            log_filter,
            top,
        }
    }
}
