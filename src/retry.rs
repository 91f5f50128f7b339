//! Optimistic retry loop shared by the tree and the list.
//!
//! A mutating operation is a sequence of attempts. An attempt traverses
//! without locks, locks the nodes it needs, validates, and either commits
//! ([`Attempt::Done`]) or releases everything and asks to be re-run
//! ([`Attempt::Retry`]). Only lock contention backs off; a failed validation
//! means someone else made progress, so the next attempt starts at once.

use crate::config::{Config, RetryBackoff};
use crate::stats::Counters;
use crate::tracing_helpers::{trace_log, warn_log};

/// Outcome of one locked attempt of a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt<T> {
    /// The operation committed, or observed its answer under validation.
    Done(T),
    /// Nothing was changed; traverse again.
    Retry(RetryCause),
}

/// Why an attempt was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryCause {
    /// The locked view no longer matched the traversal.
    Validation,
    /// A `try_lock` failed; everything was released.
    Contended,
}

/// Drive `attempt` until it reports `Done`.
#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
pub(crate) fn run_until_done<T, F>(
    op: &'static str,
    key: i32,
    config: &'static Config,
    counters: &Counters,
    mut attempt: F,
) -> T
where
    F: FnMut() -> Attempt<T>,
{
    let mut backoff = RetryBackoff::with_config(config);
    let mut retries: u64 = 0;

    loop {
        let cause: RetryCause = match attempt() {
            Attempt::Done(value) => return value,
            Attempt::Retry(cause) => cause,
        };

        retries += 1;
        trace_log!(op, key, ?cause, retries, "attempt abandoned");

        if retries == config.retry_warn_threshold() {
            warn_log!(op, key, retries, "operation keeps retrying");
        }

        match cause {
            RetryCause::Validation => counters.validation_retry(),
            RetryCause::Contended => {
                counters.lock_retry();
                backoff.snooze();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_done_is_returned() {
        let counters = Counters::default();
        let value = run_until_done("test", 0, Config::global(), &counters, || Attempt::Done(7));
        assert_eq!(value, 7);
        assert_eq!(counters.snapshot().total_retries(), 0);
    }

    #[test]
    fn test_retries_are_counted_by_cause() {
        let counters = Counters::default();
        let mut script = vec![
            Attempt::Done(true),
            Attempt::Retry(RetryCause::Contended),
            Attempt::Retry(RetryCause::Validation),
            Attempt::Retry(RetryCause::Validation),
        ];

        let value = run_until_done("test", 1, Config::global(), &counters, || {
            script.pop().unwrap_or(Attempt::Done(false))
        });

        assert!(value);
        let snap = counters.snapshot();
        assert_eq!(snap.validation_retries, 2);
        assert_eq!(snap.lock_retries, 1);
    }
}
