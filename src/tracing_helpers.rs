//! Zero-cost logging helpers.
//!
//! With the `tracing` feature these macros forward to the `tracing` crate.
//! Without it (default) they expand to nothing, so the hot retry loops in
//! [`crate::tree`] and [`crate::list`] carry no logging cost.
//!
//! ```bash
//! # Normal build - no logging overhead
//! cargo build --release
//!
//! # Watch relocation and retry activity in a test
//! RUST_LOG=lazyset=trace cargo test --features tracing relocation
//! ```
//!
//! Instrument a function only when the feature is on:
//!
//! ```ignore
//! #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, guard)))]
//! fn remove_with_guard(&self, key: i32, guard: &LocalGuard<'_>) -> bool { /* ... */ }
//! ```

#![allow(unused_macros, unused_imports)]

/// Trace-level logging (most verbose). No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

/// Warn-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_log {
    ($($arg:tt)*) => {};
}

/// Error-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! error_log {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! error_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use error_log;
pub(crate) use trace_log;
pub(crate) use warn_log;
