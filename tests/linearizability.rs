//! Linearizability checks for randomized concurrent histories.
//!
//! Threads run random `insert` / `remove` / `contains` calls on a small key
//! range and record each call with invocation and response timestamps from
//! a shared counter. Linearizability is local, so every key's sub-history is
//! checked on its own by a brute-force search (Wing & Gong with memoization)
//! against a sequential set-of-one-key model.
//!
//! ```bash
//! cargo test --test linearizability --release
//! ```

#![expect(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

mod common;

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{KeyRng, all_sets};
use lazyset::ConcurrentSet;

// =============================================================================
// History
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Insert,
    Remove,
    Contains,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    key: i32,
    kind: Kind,
    result: bool,
    invoked: u64,
    returned: u64,
}

/// Sequential model of one key: returns `(result, present_after)`.
const fn apply(kind: Kind, present: bool) -> (bool, bool) {
    match kind {
        Kind::Insert => (!present, true),
        Kind::Remove => (present, false),
        Kind::Contains => (present, present),
    }
}

// =============================================================================
// Checker
// =============================================================================

/// Whether a single-key history has a legal linearization from `initial`.
fn is_linearizable(history: &[Event], initial: bool) -> bool {
    assert!(history.len() <= 128, "history too long for the checker");
    let mut seen: HashSet<(u128, bool)> = HashSet::new();
    search(history, 0, initial, &mut seen)
}

fn search(history: &[Event], done: u128, present: bool, seen: &mut HashSet<(u128, bool)>) -> bool {
    if done.count_ones() as usize == history.len() {
        return true;
    }
    if !seen.insert((done, present)) {
        return false;
    }

    let pending = || {
        history
            .iter()
            .enumerate()
            .filter(move |(i, _)| done & (1_u128 << i) == 0)
    };

    // Only calls invoked before the earliest pending response may go next.
    let horizon: u64 = pending().map(|(_, e)| e.returned).min().unwrap();

    for (i, event) in pending() {
        if event.invoked > horizon {
            continue;
        }
        let (result, next) = apply(event.kind, present);
        if result == event.result && search(history, done | (1_u128 << i), next, seen) {
            return true;
        }
    }

    false
}

// =============================================================================
// Recording
// =============================================================================

static CLOCK: AtomicU64 = AtomicU64::new(0);

fn tick() -> u64 {
    CLOCK.fetch_add(1, Ordering::SeqCst)
}

fn run_round(set: &Arc<dyn ConcurrentSet>, round: usize, threads: usize, ops: usize) -> Vec<Event> {
    const HOT_LOW: i32 = 8;
    const HOT_KEYS: i32 = 8;

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let set = Arc::clone(set);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = KeyRng::for_thread(round * 64 + t);
                let mut events: Vec<Event> = Vec::with_capacity(ops);
                barrier.wait();

                for _ in 0..ops {
                    let key = HOT_LOW + rng.key_below(HOT_KEYS);
                    let kind = match rng.percent() {
                        0..35 => Kind::Insert,
                        35..70 => Kind::Remove,
                        _ => Kind::Contains,
                    };

                    let invoked = tick();
                    let result = match kind {
                        Kind::Insert => set.insert(key),
                        Kind::Remove => set.remove(key),
                        Kind::Contains => set.contains(key),
                    };
                    let returned = tick();

                    events.push(Event {
                        key,
                        kind,
                        result,
                        invoked,
                        returned,
                    });
                }
                events
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect()
}

/// Populate `0..32` in an order that gives the tree internal two-child nodes
/// around the hot keys, so removals exercise successor relocation.
fn populate(set: &dyn ConcurrentSet) {
    for key in [16, 8, 24, 4, 12, 20, 28, 10, 14, 9, 11, 13, 15] {
        set.insert(key);
    }
    for key in 0..32 {
        set.insert(key);
    }
}

fn check_round(name: &str, round: usize, events: &[Event]) {
    let mut by_key: BTreeMap<i32, Vec<Event>> = BTreeMap::new();
    for event in events {
        by_key.entry(event.key).or_default().push(*event);
    }

    for (key, history) in &by_key {
        assert!(
            is_linearizable(history, true),
            "{name} round {round}: history of key {key} is not linearizable: {history:#?}"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn random_histories_are_linearizable() {
    common::init_tracing();

    const ROUNDS: usize = 60;
    const THREADS: usize = 4;
    const OPS_PER_THREAD: usize = 32;

    for round in 0..ROUNDS {
        for (name, set) in all_sets() {
            populate(set.as_ref());
            let events = run_round(&set, round, THREADS, OPS_PER_THREAD);
            check_round(name, round, &events);
            set.check_invariants().unwrap();
        }
    }
}

#[test]
fn checker_accepts_overlapping_calls_in_either_order() {
    // remove() -> true overlaps contains() -> true: contains goes first.
    let history = [
        Event {
            key: 1,
            kind: Kind::Remove,
            result: true,
            invoked: 0,
            returned: 3,
        },
        Event {
            key: 1,
            kind: Kind::Contains,
            result: true,
            invoked: 1,
            returned: 2,
        },
    ];
    assert!(is_linearizable(&history, true));
}

#[test]
fn checker_rejects_stale_read() {
    // remove() -> true finishes before contains() -> true starts.
    let history = [
        Event {
            key: 1,
            kind: Kind::Remove,
            result: true,
            invoked: 0,
            returned: 1,
        },
        Event {
            key: 1,
            kind: Kind::Contains,
            result: true,
            invoked: 2,
            returned: 3,
        },
    ];
    assert!(!is_linearizable(&history, true));
}

#[test]
fn checker_rejects_double_insert() {
    let history = [
        Event {
            key: 1,
            kind: Kind::Insert,
            result: true,
            invoked: 0,
            returned: 2,
        },
        Event {
            key: 1,
            kind: Kind::Insert,
            result: true,
            invoked: 1,
            returned: 3,
        },
    ];
    assert!(!is_linearizable(&history, false));
}
