//! FELRU: a fixed-capacity approximate cache built from pocket dictionaries.
//!
//! The cache answers one question, "have we seen this key recently?", and
//! on a miss records the key, possibly displacing an older entry. Keys are
//! dispatched by a hash split to an array of pocket dictionaries (PDs): small
//! fixed-capacity containers, each a mutual-exclusion unit, each running its
//! own per-group LRU inside a Fano-Elias coded layout.
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                     BinCache                                 |
//! |                                                              |
//! |  hash(key) --> bin = hash % N     fp = (hash / N) & 0xFFFF   |
//! |                 |                                            |
//! |                 v                                            |
//! |  +--------------------------------------------------------+  |
//! |  | PD 0 | PD 1 | PD 2 |  ...                      | PD N-1 |  |
//! |  +--------------------------------------------------------+  |
//! |     each PD: 27 entries in 32 quotient groups,               |
//! |     group sizes coded in one 64-bit header word,             |
//! |     MRU-first within a group, local eviction when full       |
//! +--------------------------------------------------------------+
//! ```
//!
//! Membership is approximate: a PD stores 16-bit fingerprints, verified
//! against the stored key handle, and evicts locally, so the cache can both
//! forget keys and (across handle reuse) confuse them. What it guarantees is
//! constant-size state, O(27)-bounded operations, and per-group LRU ordering.
//!
//! # Example
//!
//! ```
//! use felru::BinCache;
//!
//! let mut cache: BinCache = BinCache::new(1 << 10).unwrap();
//! assert!(!cache.set(42)); // first sighting: miss, recorded
//! assert!(cache.set(42)); // second sighting: hit, promoted
//! ```
//!
//! [`ConcurrentBinCache`] is the same structure with a test-and-set spin
//! flag per PD for use from multiple threads.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod deque;
mod dictionary;
mod entry;
mod error;
mod hasher;
mod header;
mod packed;
mod policy;
mod stats;
mod sync;

pub use deque::DequePd;
pub use dictionary::{Eviction, GROUP_BITS, NUM_GROUPS, PD_CAPACITY, PocketDictionary};
pub use entry::{InlineEntry, PackedEntry};
pub use error::{CacheError, CacheResult};
pub use hasher::{IdentityHasher, KeyHasher, MulShiftHasher, RandomStateHasher};
pub use header::{Header, bit_index, bit_index_fallback, select};
pub use packed::PackedPd;
pub use policy::{EvictNearest, EvictPolicy, GroupPolicy, LowestGroup, NearestGroup, SameGroup};
pub use stats::{EvictionSnapshot, EvictionStats};

use std::cell::UnsafeCell;
use std::fmt;

use crate::sync::SpinLock;

/// Name of the eviction policy reported by [`BinCache::describe`].
const POLICY_NAME: &str = "FELRU";

fn build_pds<P: PocketDictionary>(capacity: usize) -> CacheResult<Vec<P>> {
    let count = capacity / PD_CAPACITY;
    if count == 0 {
        return Err(CacheError::InvalidCapacity);
    }
    Ok((0..count).map(|_| P::default()).collect())
}

/// Split a hash into a bin index and a 16-bit fingerprint.
#[inline]
fn route(hash: u64, bins: usize) -> (usize, u16) {
    let bins = bins as u64;
    ((hash % bins) as usize, ((hash / bins) & 0xFFFF) as u16)
}

/// Single-threaded bin cache.
///
/// A vector of pocket dictionaries indexed by `hash(key) % N`, with the
/// remaining hash bits used as the fingerprint inside the chosen PD. The
/// PD shape `P` and key hasher `H` are supplied at construction.
#[derive(Debug)]
pub struct BinCache<P = PackedPd, H = IdentityHasher> {
    pds: Vec<P>,
    hasher: H,
    stats: EvictionStats,
    /// Capacity as requested, before rounding down to whole PDs.
    size: usize,
}

impl<P: PocketDictionary> BinCache<P, IdentityHasher> {
    /// Create a cache for roughly `capacity` entries with the identity
    /// hasher.
    ///
    /// The effective capacity is `capacity` rounded down to a whole number
    /// of pocket dictionaries. Fails when that rounds to zero.
    pub fn new(capacity: usize) -> CacheResult<Self> {
        Self::with_hasher(capacity, IdentityHasher)
    }
}

impl<P: PocketDictionary, H: KeyHasher> BinCache<P, H> {
    /// Create a cache for roughly `capacity` entries using `hasher` for key
    /// dispatch.
    pub fn with_hasher(capacity: usize, hasher: H) -> CacheResult<Self> {
        Ok(Self {
            pds: build_pds(capacity)?,
            hasher,
            stats: EvictionStats::new(),
            size: capacity,
        })
    }

    /// Probe for `key`, recording it on a miss.
    ///
    /// Returns `true` on a hit. A hit promotes the entry to the front of its
    /// quotient group; a miss inserts it there, evicting an older entry if
    /// the PD is full.
    pub fn set(&mut self, key: u64) -> bool {
        let (bin, fp) = route(self.hasher.hash_key(key), self.pds.len());
        let pd = &mut self.pds[bin];
        let hit = pd.find(fp, key).is_some();
        if !hit {
            if let Some(eviction) = pd.insert(fp, key) {
                self.stats.record(&eviction);
            }
        }
        hit
    }

    /// Probe for `key` without recording a miss.
    ///
    /// A hit still promotes the entry.
    pub fn contains(&mut self, key: u64) -> bool {
        let (bin, fp) = route(self.hasher.hash_key(key), self.pds.len());
        self.pds[bin].find(fp, key).is_some()
    }

    /// Print the policy name and cache size to stdout.
    pub fn describe(&self) {
        println!("{self}");
    }

    /// Effective capacity: whole pocket dictionaries worth of entries.
    pub fn capacity(&self) -> usize {
        self.pds.len() * PD_CAPACITY
    }

    /// Number of pocket dictionaries.
    pub fn pd_count(&self) -> usize {
        self.pds.len()
    }

    /// Total entries currently stored across all pocket dictionaries.
    pub fn occupancy(&self) -> usize {
        self.pds.iter().map(P::occupancy).sum()
    }

    /// Eviction counters for this cache.
    pub fn eviction_stats(&self) -> &EvictionStats {
        &self.stats
    }
}

impl<P, H> fmt::Display for BinCache<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Eviction Policy: {POLICY_NAME}")?;
        write!(f, "Cache size: {}", self.size)
    }
}

/// One pocket dictionary behind its spin flag.
struct Shard<P> {
    lock: SpinLock,
    pd: UnsafeCell<P>,
}

// SAFETY: the inner PD is only reached through `with`, which holds the spin
// lock for the duration of the access.
unsafe impl<P: Send> Sync for Shard<P> {}

impl<P> Shard<P> {
    fn new(pd: P) -> Self {
        Self {
            lock: SpinLock::new(),
            pd: UnsafeCell::new(pd),
        }
    }

    /// Run `f` with exclusive access to the shard's PD.
    #[inline]
    fn with<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        self.lock.lock();
        // SAFETY: the spin lock is held, so no other thread can observe or
        // mutate the PD until `unlock`.
        let out = f(unsafe { &mut *self.pd.get() });
        self.lock.unlock();
        out
    }
}

/// Bin cache shared between threads.
///
/// Identical dispatch and semantics to [`BinCache`], with a test-and-set
/// spin flag per pocket dictionary. Operations on distinct PDs proceed in
/// parallel; the probe-then-insert pair of one `set` is atomic with respect
/// to other threads targeting the same PD. Critical sections are bounded by
/// the PD capacity, so waiters spin rather than park.
pub struct ConcurrentBinCache<P = PackedPd, H = IdentityHasher> {
    shards: Vec<Shard<P>>,
    hasher: H,
    stats: EvictionStats,
    size: usize,
}

impl<P: PocketDictionary> ConcurrentBinCache<P, IdentityHasher> {
    /// Create a cache for roughly `capacity` entries with the identity
    /// hasher.
    pub fn new(capacity: usize) -> CacheResult<Self> {
        Self::with_hasher(capacity, IdentityHasher)
    }
}

impl<P: PocketDictionary, H: KeyHasher> ConcurrentBinCache<P, H> {
    /// Create a cache for roughly `capacity` entries using `hasher` for key
    /// dispatch.
    pub fn with_hasher(capacity: usize, hasher: H) -> CacheResult<Self> {
        Ok(Self {
            shards: build_pds(capacity)?.into_iter().map(Shard::new).collect(),
            hasher,
            stats: EvictionStats::new(),
            size: capacity,
        })
    }

    /// Probe for `key`, recording it on a miss. Returns `true` on a hit.
    pub fn set(&self, key: u64) -> bool {
        let (bin, fp) = route(self.hasher.hash_key(key), self.shards.len());
        let (hit, eviction) = self.shards[bin].with(|pd| {
            let hit = pd.find(fp, key).is_some();
            let eviction = if hit { None } else { pd.insert(fp, key) };
            (hit, eviction)
        });
        // Counters are updated outside the critical section.
        if let Some(eviction) = eviction {
            self.stats.record(&eviction);
        }
        hit
    }

    /// Probe for `key` without recording a miss. A hit still promotes.
    pub fn contains(&self, key: u64) -> bool {
        let (bin, fp) = route(self.hasher.hash_key(key), self.shards.len());
        self.shards[bin].with(|pd| pd.find(fp, key).is_some())
    }

    /// Print the policy name and cache size to stdout.
    pub fn describe(&self) {
        println!("{self}");
    }

    /// Effective capacity: whole pocket dictionaries worth of entries.
    pub fn capacity(&self) -> usize {
        self.shards.len() * PD_CAPACITY
    }

    /// Number of pocket dictionaries.
    pub fn pd_count(&self) -> usize {
        self.shards.len()
    }

    /// Total entries currently stored across all pocket dictionaries.
    pub fn occupancy(&self) -> usize {
        self.shards.iter().map(|s| s.with(|pd| pd.occupancy())).sum()
    }

    /// Eviction counters for this cache.
    pub fn eviction_stats(&self) -> &EvictionStats {
        &self.stats
    }
}

impl<P, H> fmt::Display for ConcurrentBinCache<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Eviction Policy: {POLICY_NAME}")?;
        write!(f, "Cache size: {}", self.size)
    }
}
