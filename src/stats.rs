//! Eviction telemetry.
//!
//! The bin cache owns a set of counters fed by the [`Eviction`] records its
//! pocket dictionaries report: a running eviction total plus a histogram of
//! victim group sizes, one bucket per possible size. [`EvictionStats::take`]
//! reads and resets the histogram so periodic observers see deltas.

// These counters are observational only, never synchronization, so they use
// std atomics directly even under loom.
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dictionary::{Eviction, PD_CAPACITY};

/// Atomic eviction counters owned by a bin cache.
#[derive(Debug)]
pub struct EvictionStats {
    evictions: AtomicU64,
    /// Victim group size observed at eviction time; index = size.
    group_sizes: [AtomicU64; PD_CAPACITY + 1],
}

impl EvictionStats {
    pub(crate) fn new() -> Self {
        Self {
            evictions: AtomicU64::new(0),
            group_sizes: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Record one eviction.
    pub(crate) fn record(&self, eviction: &Eviction) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        let size = usize::from(eviction.group_len).min(PD_CAPACITY);
        self.group_sizes[size].fetch_add(1, Ordering::Relaxed);
    }

    /// Read the counters without resetting them.
    pub fn snapshot(&self) -> EvictionSnapshot {
        EvictionSnapshot {
            evictions: self.evictions.load(Ordering::Relaxed),
            group_sizes: std::array::from_fn(|i| self.group_sizes[i].load(Ordering::Relaxed)),
        }
    }

    /// Read the counters and reset them to zero.
    pub fn take(&self) -> EvictionSnapshot {
        EvictionSnapshot {
            evictions: self.evictions.swap(0, Ordering::Relaxed),
            group_sizes: std::array::from_fn(|i| self.group_sizes[i].swap(0, Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of a cache's eviction counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionSnapshot {
    /// Total evictions since construction or the last [`EvictionStats::take`].
    pub evictions: u64,
    /// Count of evictions per victim group size; index = group size.
    pub group_sizes: [u64; PD_CAPACITY + 1],
}
