//! Deque-backed pocket dictionary.
//!
//! The straightforward rendition of the same container: one `VecDeque` per
//! quotient group, entries carrying remainder and key handle inline, front of
//! each deque = most recently used. Larger than the bit-packed shape and
//! without the cache-line-resident header, but convenient as a reference
//! shape and for policies that want to inspect whole groups.

use std::collections::VecDeque;

use crate::dictionary::{Eviction, NUM_GROUPS, PD_CAPACITY, PocketDictionary, split_fingerprint};
use crate::entry::InlineEntry;
use crate::policy::{GroupPolicy, NearestGroup};

/// Fixed-capacity associative container over per-quotient deques.
///
/// Probes match remainder and key handle together; hits rotate to the front
/// of their group. When full, the victim policy names a non-empty group and
/// its back entry is dropped.
#[derive(Debug, Clone)]
pub struct DequePd<P: GroupPolicy = NearestGroup> {
    groups: [VecDeque<InlineEntry>; NUM_GROUPS],
    occupancy: usize,
    policy: P,
}

impl<P: GroupPolicy> Default for DequePd<P> {
    fn default() -> Self {
        Self {
            groups: std::array::from_fn(|_| VecDeque::new()),
            occupancy: 0,
            policy: P::default(),
        }
    }
}

impl<P: GroupPolicy> DequePd<P> {
    /// Create an empty dictionary with the default victim policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored for quotient `q`.
    pub fn group_len(&self, q: u16) -> usize {
        self.groups[q as usize].len()
    }

    fn evict(&mut self, q: u16) -> Eviction {
        debug_assert_eq!(self.occupancy, PD_CAPACITY);
        let victim = self.policy.choose_victim(&self.groups, q);
        let group_len = self.groups[victim].len();
        debug_assert!(group_len > 0);
        self.groups[victim].pop_back();
        self.occupancy -= 1;
        Eviction {
            quotient: victim as u8,
            group_len: group_len as u8,
        }
    }
}

impl<P: GroupPolicy> PocketDictionary for DequePd<P> {
    fn find(&mut self, fp: u16, key: u64) -> Option<u64> {
        let (q, r) = split_fingerprint(fp);
        let group = &mut self.groups[q as usize];
        let at = group
            .iter()
            .position(|entry| entry.remainder == r && entry.key == key)?;
        let entry = group.remove(at)?;
        group.push_front(entry);
        Some(entry.key)
    }

    fn insert(&mut self, fp: u16, key: u64) -> Option<Eviction> {
        let (q, r) = split_fingerprint(fp);
        let evicted = if self.occupancy >= PD_CAPACITY {
            Some(self.evict(q))
        } else {
            None
        };
        self.groups[q as usize].push_front(InlineEntry::new(r, key));
        self.occupancy += 1;
        evicted
    }

    fn occupancy(&self) -> usize {
        self.occupancy
    }
}
