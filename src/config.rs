//! Process-wide tuning for the retry loops.
//!
//! Values are read once from the environment and cached:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `LAZYSET_SPIN_LIMIT` | 64 | backoff steps that busy-spin |
//! | `LAZYSET_YIELD_LIMIT` | 1024 | backoff steps (total) before sleeping |
//! | `LAZYSET_RETRY_WARN` | 10000 | retries of one operation before a warning is logged |
//!
//! Unparsable values fall back to the default.

use std::sync::OnceLock;
use std::time::Duration;

use crate::tracing_helpers::warn_log;

/// Environment variable for [`Config::spin_limit`].
pub const SPIN_LIMIT_VAR: &str = "LAZYSET_SPIN_LIMIT";

/// Environment variable for [`Config::yield_limit`].
pub const YIELD_LIMIT_VAR: &str = "LAZYSET_YIELD_LIMIT";

/// Environment variable for [`Config::retry_warn_threshold`].
pub const RETRY_WARN_VAR: &str = "LAZYSET_RETRY_WARN";

const DEFAULT_SPIN_LIMIT: u32 = 64;
const DEFAULT_YIELD_LIMIT: u32 = 1024;
const DEFAULT_RETRY_WARN: u64 = 10_000;

/// Sleep used once a backoff is past the yield phase.
const BACKOFF_SLEEP: Duration = Duration::from_micros(10);

/// Retry and backoff tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    spin_limit: u32,
    yield_limit: u32,
    retry_warn_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spin_limit: DEFAULT_SPIN_LIMIT,
            yield_limit: DEFAULT_YIELD_LIMIT,
            retry_warn_threshold: DEFAULT_RETRY_WARN,
        }
    }
}

impl Config {
    /// Build a config from the `LAZYSET_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead of
    /// mutating the process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let spin_limit: u32 = parse_or(&lookup, SPIN_LIMIT_VAR, defaults.spin_limit);
        let yield_limit: u32 = parse_or(&lookup, YIELD_LIMIT_VAR, defaults.yield_limit);
        let retry_warn_threshold: u64 =
            parse_or(&lookup, RETRY_WARN_VAR, defaults.retry_warn_threshold);

        Self {
            spin_limit,
            // The yield phase starts where spinning stops.
            yield_limit: yield_limit.max(spin_limit),
            retry_warn_threshold,
        }
    }

    /// The config shared by every structure in the process.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<Config> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Backoff steps that busy-spin.
    #[inline]
    #[must_use]
    pub const fn spin_limit(&self) -> u32 {
        self.spin_limit
    }

    /// Backoff steps, counted from the first, after which backoff sleeps.
    #[inline]
    #[must_use]
    pub const fn yield_limit(&self) -> u32 {
        self.yield_limit
    }

    /// Retries of a single operation after which a warning is logged.
    #[inline]
    #[must_use]
    pub const fn retry_warn_threshold(&self) -> u64 {
        self.retry_warn_threshold
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn_log!(var = name, value = %raw, "ignoring unparsable setting");
            default
        }),
    }
}

// ============================================================================
//  RetryBackoff
// ============================================================================

/// Three-phase backoff between attempts of one operation.
///
/// Phase 1 spins, phase 2 yields the thread, phase 3 sleeps briefly.
#[derive(Debug)]
pub(crate) struct RetryBackoff {
    step: u32,
    config: &'static Config,
}

impl RetryBackoff {
    pub(crate) const fn with_config(config: &'static Config) -> Self {
        Self { step: 0, config }
    }

    /// Wait before the next attempt.
    pub(crate) fn snooze(&mut self) {
        if self.step < self.config.spin_limit() {
            std::hint::spin_loop();
        } else if self.step < self.config.yield_limit() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(BACKOFF_SLEEP);
        }

        self.step = self.step.saturating_add(1);
    }

    #[cfg(test)]
    const fn steps(&self) -> u32 {
        self.step
    }
}
