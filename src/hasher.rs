//! Key hashing capabilities for the bin cache.
//!
//! The cache splits one 64-bit hash into a bin index (modulo the PD count)
//! and a 16-bit fingerprint (the quotient above it), so hash quality decides
//! how evenly keys spread across pocket dictionaries. Three options:
//!
//! - [`IdentityHasher`] for pre-mixed keys and deterministic tests
//! - [`MulShiftHasher`], a fixed-constant multiply-shift mixer
//! - [`RandomStateHasher`], seeded per-process via `ahash`

use ahash::RandomState;

/// Maps a 64-bit key to the 64-bit hash the bin cache splits.
pub trait KeyHasher {
    /// Hash one key.
    fn hash_key(&self, key: u64) -> u64;
}

/// No-op hasher; the key is used as its own hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHasher;

impl KeyHasher for IdentityHasher {
    #[inline]
    fn hash_key(&self, key: u64) -> u64 {
        key
    }
}

/// Multiply-shift hasher: the high half of a 128-bit product with a fixed
/// odd constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulShiftHasher;

impl MulShiftHasher {
    const MULTIPLIER: u128 = 0x51502a8334304aae_9743df29cdf1096f;
}

impl KeyHasher for MulShiftHasher {
    #[inline]
    fn hash_key(&self, key: u64) -> u64 {
        ((u128::from(key).wrapping_mul(Self::MULTIPLIER)) >> 64) as u64
    }
}

/// `ahash`-backed hasher with per-process random seeds.
///
/// Fixed seeds under `cfg(test)` keep bin placement deterministic in tests.
#[derive(Debug, Clone)]
pub struct RandomStateHasher {
    state: RandomState,
}

impl Default for RandomStateHasher {
    fn default() -> Self {
        #[cfg(test)]
        let state = RandomState::with_seeds(
            0xbb8c484891ec6c86,
            0x0522a25ae9c769f9,
            0xeed2797b9571bc75,
            0x4feb29c1fbbd59d0,
        );
        #[cfg(not(test))]
        let state = RandomState::new();
        Self { state }
    }
}

impl RandomStateHasher {
    /// Create a hasher with fresh random seeds.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyHasher for RandomStateHasher {
    #[inline]
    fn hash_key(&self, key: u64) -> u64 {
        self.state.hash_one(key)
    }
}
