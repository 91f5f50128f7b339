//! Shared helpers for the integration tests.
//!
//! - [`init_tracing`]: one subscriber per test binary. Library events only
//!   exist with `--features tracing`.
//! - [`KeyRng`]: seeded per-thread key generator, so failures replay.
//! - [`all_sets`]: the tree and the list behind `dyn ConcurrentSet`.
//!
//! Logging is controlled by `RUST_LOG` (default `info`). Events also go to
//! `$LAZYSET_LOG_DIR/lazyset.jsonl` (default `logs/`), one JSON object per
//! line; `LAZYSET_LOG_CONSOLE=0` silences the console copy. Relocations log
//! `removed` and `successor` fields, retries log `op`, `key` and `cause`.

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};

use lazyset::{ConcurrentSet, LazyList, LazyTree};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE: &str = "lazyset.jsonl";

static INIT: Once = Once::new();

/// Install the test subscriber. Later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(install_subscriber);
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[expect(clippy::expect_used)]
fn install_subscriber() {
    let log_dir: PathBuf =
        env::var_os("LAZYSET_LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from);
    let console: bool = env::var("LAZYSET_LOG_CONSOLE").ok().is_none_or(|v| v != "0");

    std::fs::create_dir_all(&log_dir).expect("create log directory");

    // Append: each test binary is its own process and shares the file.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))
        .expect("open log file");

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_names(true)
            .with_target(true)
            .compact()
            .with_filter(filter())
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(filter());

    // A subscriber may already be installed by another helper.
    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

// ============================================================================
//  Key generation
// ============================================================================

/// Small deterministic generator (64-bit LCG), one per thread.
#[derive(Debug, Clone)]
pub struct KeyRng {
    state: u64,
}

impl KeyRng {
    /// Generator for thread `t` of a test.
    pub fn for_thread(t: usize) -> Self {
        Self {
            state: (t as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(0x5851_F42D_4C95_7F2D)
            .wrapping_add(0x1405_7B7E_F767_814F);
        self.state
    }

    /// Key in `0..range`.
    pub fn key_below(&mut self, range: i32) -> i32 {
        debug_assert!(range > 0);
        ((self.next_u64() >> 33) % range as u64) as i32
    }

    /// Value in `0..100`, for picking an operation mix.
    pub fn percent(&mut self) -> u32 {
        ((self.next_u64() >> 40) % 100) as u32
    }
}

// ============================================================================
//  Set implementations
// ============================================================================

/// Every set implementation, boxed, for tests that run against all of them.
pub fn all_sets() -> Vec<(&'static str, Arc<dyn ConcurrentSet>)> {
    vec![
        ("tree", Arc::new(LazyTree::new()) as Arc<dyn ConcurrentSet>),
        ("list", Arc::new(LazyList::new()) as Arc<dyn ConcurrentSet>),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!(key = 7, "subscriber installed");
    }

    #[test]
    fn test_key_rng_is_deterministic_and_bounded() {
        let mut a = KeyRng::for_thread(3);
        let mut b = KeyRng::for_thread(3);
        for _ in 0..1000 {
            let key = a.key_below(17);
            assert_eq!(key, b.key_below(17));
            assert!((0..17).contains(&key));
        }
    }
}
