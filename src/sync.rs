//! Synchronization primitives with optional loom support.
//!
//! Atomic types resolve to loom's under the `loom` feature so the spin lock
//! can be model-checked, and to std atomics otherwise.

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};

/// Spin loop hint for busy waiting.
///
/// Under loom this yields instead, which the model checker requires to make
/// progress.
#[inline]
pub(crate) fn spin_loop() {
    #[cfg(not(feature = "loom"))]
    std::hint::spin_loop();

    #[cfg(feature = "loom")]
    loom::thread::yield_now();
}

/// Test-and-set spin lock guarding one pocket dictionary.
///
/// Critical sections are bounded by the dictionary capacity, so contended
/// waiters spin on relaxed reads rather than parking: acquire on the winning
/// swap, release on unlock.
pub(crate) struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub(crate) fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, spinning until it is free.
    #[inline]
    pub(crate) fn lock(&self) {
        while self.locked.swap(true, Ordering::Acquire) {
            // Read-only spin until the holder clears the flag, then retry
            // the swap.
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    /// Release the lock.
    #[inline]
    pub(crate) fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
