//! Error types for cache construction.
//!
//! The cache itself is total: `set` always answers with a hit flag, probes
//! answer present or absent, and eviction never fails. Only construction can
//! go wrong.

use std::fmt;

/// Errors that can occur while building a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// The requested capacity yields zero pocket dictionaries (smaller than
    /// one dictionary's worth of entries).
    InvalidCapacity,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity => write!(f, "capacity smaller than one pocket dictionary"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache construction.
pub type CacheResult<T> = Result<T, CacheError>;
