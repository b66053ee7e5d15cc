//! Bit-packed pocket dictionary.
//!
//! The entire dictionary is one constant-sized record:
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        PackedPd                              |
//! |                                                              |
//! |  header: u64     32 delimiters + per-group run zeros         |
//! |  entries: [u16; 27]   dense, grouped by quotient, MRU first  |
//! |                       [remainder:11][slot_id:5]              |
//! |  slots: [u64; 27]     key handles for live slot ids,         |
//! |                       next-free links for the rest           |
//! |  free_head: u8        head of the intrusive freelist         |
//! +--------------------------------------------------------------+
//! ```
//!
//! The dense entry array carries no per-group headers of its own: the header
//! word alone locates every quotient's slice. The side table is intrusive;
//! whether a cell holds a key handle or a freelist link is decided by whether
//! its index appears in a live entry's slot id. Draining the freelist (head
//! reaching 27) is the full signal.

use crate::dictionary::{Eviction, PD_CAPACITY, PocketDictionary, split_fingerprint};
use crate::entry::PackedEntry;
use crate::header::Header;
use crate::policy::{EvictNearest, EvictPolicy};

/// Fixed-capacity associative container with a Fano-Elias coded header and
/// an intrusive payload freelist.
///
/// Stores the 11-bit remainder of each fingerprint next to a 5-bit slot id
/// pointing at the key handle in the side table. Probes match on remainder,
/// then verify the handle against the probe key.
#[derive(Debug, Clone)]
pub struct PackedPd<P: EvictPolicy = EvictNearest> {
    header: Header,
    entries: [PackedEntry; PD_CAPACITY],
    /// Key handles for live slot ids, freelist links for free ones.
    slots: [u64; PD_CAPACITY],
    /// First free slot id; `PD_CAPACITY` when the freelist is drained.
    free_head: u8,
    policy: P,
}

impl<P: EvictPolicy> Default for PackedPd<P> {
    fn default() -> Self {
        Self {
            header: Header::EMPTY,
            entries: [PackedEntry::default(); PD_CAPACITY],
            // Thread the freelist 0 -> 1 -> ... -> 26 -> drained.
            slots: std::array::from_fn(|i| i as u64 + 1),
            free_head: 0,
            policy: P::default(),
        }
    }
}

impl<P: EvictPolicy> PackedPd<P> {
    /// Create an empty dictionary with the default victim policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current header word.
    pub fn header(&self) -> Header {
        self.header
    }

    /// Remove the back entry of the group chosen by the victim policy.
    fn evict(&mut self, q: u16) -> Eviction {
        debug_assert_eq!(self.header.occupancy(), PD_CAPACITY);
        let victim = self.policy.choose_victim(self.header, q);
        let quotient = self.header.group_of(victim);
        let group_len = self.header.group_len(quotient);

        let slot = self.header.evict_at(victim);
        let freed = self.entries[slot].slot_id();
        self.entries.copy_within(slot + 1.., slot);
        self.slots[usize::from(freed)] = u64::from(self.free_head);
        self.free_head = freed;

        Eviction {
            quotient: quotient as u8,
            group_len: group_len as u8,
        }
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        assert_eq!(self.header.raw().count_ones(), 32);
        let occupancy = self.header.occupancy();
        assert!(occupancy <= PD_CAPACITY);

        // Live slot ids and freelist links partition 0..27.
        let mut seen = [false; PD_CAPACITY];
        for entry in &self.entries[..occupancy] {
            let id = usize::from(entry.slot_id());
            assert!(!seen[id], "slot id {id} referenced twice");
            seen[id] = true;
        }
        let mut free = usize::from(self.free_head);
        for _ in occupancy..PD_CAPACITY {
            assert!(free < PD_CAPACITY, "freelist truncated");
            assert!(!seen[free], "slot id {free} live and free");
            seen[free] = true;
            free = self.slots[free] as usize;
        }
        assert!(seen.iter().all(|&s| s));
    }
}

impl<P: EvictPolicy> PocketDictionary for PackedPd<P> {
    fn find(&mut self, fp: u16, key: u64) -> Option<u64> {
        let (q, r) = split_fingerprint(fp);
        let group = self.header.group(q);
        let offset = self.entries[group.clone()]
            .iter()
            .position(|entry| entry.remainder() == r)?;
        let at = group.start + offset;

        let stored = self.slots[usize::from(self.entries[at].slot_id())];
        if stored != key {
            return None;
        }
        // Promote the hit to the front of its group.
        self.entries[group.start..=at].rotate_right(1);
        Some(stored)
    }

    fn insert(&mut self, fp: u16, key: u64) -> Option<Eviction> {
        let (q, r) = split_fingerprint(fp);
        let evicted = if usize::from(self.free_head) >= PD_CAPACITY {
            Some(self.evict(q))
        } else {
            None
        };

        let slot = self.header.reserve(q);
        self.entries.copy_within(slot..PD_CAPACITY - 1, slot + 1);

        let id = self.free_head;
        self.free_head = self.slots[usize::from(id)] as u8;
        self.entries[slot] = PackedEntry::new(id, r);
        self.slots[usize::from(id)] = key;

        #[cfg(debug_assertions)]
        self.assert_invariants();
        evicted
    }

    fn occupancy(&self) -> usize {
        self.header.occupancy()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::dictionary::NUM_GROUPS;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn fingerprint(q: u16, r: u16) -> u16 {
        q | (r << 5)
    }

    #[test]
    fn test_empty_pd_misses() {
        let mut pd = PackedPd::<EvictNearest>::new();
        assert_eq!(pd.occupancy(), 0);
        assert_eq!(pd.find(0x0020, 1), None);
        assert_eq!(pd.find(0xFFFF, u64::MAX), None);
    }

    #[test]
    fn test_insert_then_find() {
        let mut pd = PackedPd::<EvictNearest>::new();
        assert_eq!(pd.insert(0x0020, 7), None);
        assert_eq!(pd.occupancy(), 1);
        assert_eq!(pd.find(0x0020, 7), Some(7));
        assert_eq!(pd.occupancy(), 1);
    }

    #[test]
    fn test_remainder_match_requires_key() {
        let mut pd = PackedPd::<EvictNearest>::new();
        let fp = fingerprint(3, 200);
        pd.insert(fp, 42);
        assert_eq!(pd.find(fp, 42), Some(42));
        // Same fingerprint, different key handle: the remainder matches but
        // verification against the side table fails.
        assert_eq!(pd.find(fp, 43), None);
    }

    #[test]
    fn test_fill_single_group() {
        let mut pd = PackedPd::<EvictNearest>::new();
        for r in 1..=PD_CAPACITY as u16 {
            assert_eq!(pd.find(fingerprint(5, r), u64::from(r)), None);
            pd.insert(fingerprint(5, r), u64::from(r));
        }
        assert_eq!(pd.occupancy(), PD_CAPACITY);
        assert_eq!(pd.header().group_len(5), PD_CAPACITY);

        // The earliest insert is at the back; a hit moves it to the front.
        assert_eq!(pd.find(fingerprint(5, 1), 1), Some(1));
        let front = pd.header().group(5).start;
        assert_eq!(pd.entries[front].remainder(), 1);
    }

    #[test]
    fn test_mru_promotion() {
        let mut pd = PackedPd::<EvictNearest>::new();
        for r in 1..=4u16 {
            pd.insert(fingerprint(9, r), u64::from(r));
        }
        // Freshest insert leads, then insertion order reversed.
        let order =
            |pd: &PackedPd| -> Vec<u16> { pd.entries[pd.header.group(9)].iter().map(|e| e.remainder()).collect() };
        assert_eq!(order(&pd), vec![4, 3, 2, 1]);

        assert_eq!(pd.find(fingerprint(9, 2), 2), Some(2));
        assert_eq!(order(&pd), vec![2, 4, 3, 1]);

        // A hit does not change the header, only the intra-group order.
        let header = pd.header().raw();
        assert_eq!(pd.find(fingerprint(9, 3), 3), Some(3));
        assert_eq!(pd.header().raw(), header);
        assert_eq!(pd.occupancy(), 4);
    }

    #[test]
    fn test_eviction_wraps_to_nearest_group() {
        let mut pd = PackedPd::<EvictNearest>::new();
        for r in 1..=PD_CAPACITY as u16 {
            pd.insert(fingerprint(5, r), u64::from(r));
        }

        // Full dictionary, insert into quotient 6: every other group is
        // empty, so the scan wraps back to group 5 and drops its oldest
        // (r = 1, the first inserted, at the back of the slice).
        let eviction = pd.insert(fingerprint(6, 100), 1000).expect("eviction");
        assert_eq!(eviction.quotient, 5);
        assert_eq!(eviction.group_len, PD_CAPACITY as u8);
        assert_eq!(pd.occupancy(), PD_CAPACITY);

        assert_eq!(pd.find(fingerprint(5, 1), 1), None);
        let newest = PD_CAPACITY as u16;
        assert_eq!(
            pd.find(fingerprint(5, newest), u64::from(newest)),
            Some(u64::from(newest))
        );
        assert_eq!(pd.find(fingerprint(6, 100), 1000), Some(1000));
        let front = pd.header().group(6).start;
        assert_eq!(pd.entries[front].remainder(), 100);
    }

    #[test]
    fn test_eviction_prefers_group_above() {
        let mut pd = PackedPd::<EvictNearest>::new();
        for r in 1..=7u16 {
            pd.insert(fingerprint(5, r), u64::from(r));
        }
        for r in 1..=20u16 {
            pd.insert(fingerprint(20, r), u64::from(100 + r));
        }
        let eviction = pd.insert(fingerprint(6, 50), 5000).expect("eviction");
        assert_eq!(eviction.quotient, 20);
        assert_eq!(eviction.group_len, 20);
        // Group 20's oldest entry is gone, group 5 untouched.
        assert_eq!(pd.find(fingerprint(20, 1), 101), None);
        assert_eq!(pd.find(fingerprint(5, 1), 1), Some(1));
    }

    #[test]
    fn test_random_ops_preserve_invariants() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xcafe);
        let mut pd = PackedPd::<EvictNearest>::new();
        for _ in 0..50_000 {
            let fp: u16 = rng.random();
            let key = u64::from(fp) ^ 0xD1C7;
            if rng.random_ratio(1, 3) {
                pd.find(fp, key);
            } else if pd.find(fp, key).is_none() {
                pd.insert(fp, key);
            }
            #[cfg(debug_assertions)]
            pd.assert_invariants();
            let total: usize = (0..NUM_GROUPS as u16)
                .map(|q| pd.header().group_len(q))
                .sum();
            assert_eq!(total, pd.occupancy());
            assert!(pd.occupancy() <= PD_CAPACITY);
        }
    }

    #[test]
    fn test_reinsert_after_eviction_recycles_slot() {
        let mut pd = PackedPd::<EvictNearest>::new();
        for i in 0..1000u64 {
            let fp = (i % 0x1_0000) as u16;
            if pd.find(fp, i).is_none() {
                pd.insert(fp, i);
            }
            assert!(pd.occupancy() <= PD_CAPACITY);
        }
        assert_eq!(pd.occupancy(), PD_CAPACITY);
    }
}
