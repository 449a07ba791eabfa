//! Query Fingerprint Frequency Tracking
//!
//! Process-wide counting table keyed by normalized query fingerprints.
//! Bounded: when the table is full, the least-recently-seen fingerprint
//! is evicted. The table is in-memory only; a restart clears history.

use chrono::{DateTime, Utc};
use flowlens_core::{FlowlensError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default capacity of the frequency table
pub const DEFAULT_FREQUENCY_CAPACITY: usize = 10_000;

/// Observed frequency of one query fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    /// Normalized query fingerprint
    pub fingerprint: String,
    /// Times the fingerprint has been observed
    pub frequency: u64,
    /// When the fingerprint was last observed
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Slot {
    frequency: u64,
    last_seen: DateTime<Utc>,
    // Monotonic recency; wall-clock timestamps can tie within a tick
    touch: u64,
}

#[derive(Debug, Default)]
struct TableState {
    slots: HashMap<String, Slot>,
    clock: u64,
}

/// Concurrent frequency table with least-recently-seen eviction
#[derive(Debug)]
pub struct FrequencyTracker {
    state: Mutex<TableState>,
    capacity: usize,
}

impl FrequencyTracker {
    /// Creates a tracker holding at most `capacity` fingerprints
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(TableState::default()),
            capacity: capacity.max(1),
        }
    }

    /// Returns the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records one observation of a fingerprint, returning its new count
    ///
    /// Rejects blank fingerprints: a query that normalizes to nothing is a
    /// caller programming error, not an observable query shape.
    pub fn record(&self, fingerprint: &str) -> Result<u64> {
        if fingerprint.trim().is_empty() {
            return Err(FlowlensError::Validation(
                "query fingerprint must not be blank".into(),
            ));
        }

        let mut state = self.state.lock();
        state.clock += 1;
        let touch = state.clock;
        let now = Utc::now();

        if let Some(slot) = state.slots.get_mut(fingerprint) {
            slot.frequency += 1;
            slot.last_seen = now;
            slot.touch = touch;
            return Ok(slot.frequency);
        }

        if state.slots.len() >= self.capacity {
            let stale = state
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.touch)
                .map(|(key, _)| key.clone());
            if let Some(stale) = stale {
                tracing::debug!(fingerprint = %stale, "evicting least-recently-seen fingerprint");
                state.slots.remove(&stale);
            }
        }

        state.slots.insert(
            fingerprint.to_string(),
            Slot {
                frequency: 1,
                last_seen: now,
                touch,
            },
        );
        Ok(1)
    }

    /// Returns the top `n` fingerprints by frequency
    ///
    /// Ordered by frequency descending; ties broken by most recently seen
    /// first. Does not mutate the table.
    pub fn top_n(&self, n: usize) -> Vec<FrequencyEntry> {
        let state = self.state.lock();
        let mut entries: Vec<(FrequencyEntry, u64)> = state
            .slots
            .iter()
            .map(|(fingerprint, slot)| {
                (
                    FrequencyEntry {
                        fingerprint: fingerprint.clone(),
                        frequency: slot.frequency,
                        last_seen: slot.last_seen,
                    },
                    slot.touch,
                )
            })
            .collect();
        drop(state);

        entries.sort_by(|(a, a_touch), (b, b_touch)| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b_touch.cmp(a_touch))
        });
        entries.truncate(n);
        entries.into_iter().map(|(entry, _)| entry).collect()
    }

    /// Number of tracked fingerprints
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().slots.is_empty()
    }
}

impl Default for FrequencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_CAPACITY)
    }
}

/// Normalizes query text into a fingerprint
///
/// Whitespace runs collapse to a single space, and literal values
/// (quoted strings, bare numbers) are masked with `?` so textually-similar
/// queries group together. Bind placeholders like `$1` are preserved.
pub fn fingerprint(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            while let Some(n) = chars.next() {
                if n == '\'' {
                    break;
                }
            }
            out.push('?');
        } else if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
        } else if c.is_ascii_digit() && !prev_is_identifier(&out) {
            while let Some(&n) = chars.peek() {
                if n.is_ascii_digit() || n == '.' {
                    chars.next();
                } else {
                    break;
                }
            }
            out.push('?');
        } else {
            out.push(c);
        }
    }

    out.trim_end().to_string()
}

/// True when the last emitted char continues an identifier or placeholder,
/// so a digit after it is not a standalone literal (`col2`, `$1`)
fn prev_is_identifier(out: &str) -> bool {
    out.chars()
        .next_back()
        .map(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '?')
        .unwrap_or(false)
}
