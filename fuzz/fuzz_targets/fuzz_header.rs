#![no_main]

use felru::{
    Eviction, NUM_GROUPS, PD_CAPACITY, PackedPd, PocketDictionary, bit_index, bit_index_fallback,
    select,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First 10 bytes: cross-check the bit deposit against its fallback.
    if data.len() >= 10 {
        let word = u64::from_le_bytes(data[..8].try_into().unwrap());
        let rank = u16::from_le_bytes(data[8..10].try_into().unwrap()) % 64;
        if u32::from(rank) < word.count_ones() {
            let deposited = bit_index(word, rank);
            assert_eq!(deposited, bit_index_fallback(word, rank));
            assert_eq!(deposited.count_ones(), 1);
            assert_eq!(deposited & word, deposited, "deposit left the word");

            let position = select(word, rank);
            assert!(position < 64);
            // Exactly `rank` set bits sit below the selected position.
            assert_eq!((word & ((1u64 << position) - 1)).count_ones(), u32::from(rank));
        }
    }

    // Remaining bytes: a fingerprint stream driving one pocket dictionary.
    // Debug assertions inside insert re-verify the header popcount and the
    // freelist partition after every step.
    let mut pd: PackedPd = PackedPd::new();
    for (i, chunk) in data.chunks_exact(2).enumerate() {
        let fp = u16::from_le_bytes([chunk[0], chunk[1]]);
        // Cycle a small salt so the same fingerprint arrives both with its
        // previous key handle (hit path) and with a fresh one (remainder
        // match, key mismatch path).
        let key = u64::from(fp) ^ (((i % 3) as u64) << 32);

        let before = pd.occupancy();
        if let Some(found) = pd.find(fp, key) {
            assert_eq!(found, key);
            // A hit never changes the occupancy.
            assert_eq!(pd.occupancy(), before);
            // The promoted entry is immediately findable again.
            assert_eq!(pd.find(fp, key), Some(key));
        } else {
            let eviction = pd.insert(fp, key);
            match eviction {
                Some(Eviction {
                    quotient,
                    group_len,
                }) => {
                    assert_eq!(before, PD_CAPACITY);
                    assert!(usize::from(quotient) < NUM_GROUPS);
                    assert!((1..=PD_CAPACITY).contains(&usize::from(group_len)));
                    assert_eq!(pd.occupancy(), PD_CAPACITY);
                }
                None => {
                    assert_eq!(pd.occupancy(), before + 1);
                }
            }
            assert_eq!(pd.find(fp, key), Some(key));
        }
        assert!(pd.occupancy() <= PD_CAPACITY);
    }
});
