//! Core Release Gate
//!
//! One-way flag the primary core sets once global initialisation is done.
//! Secondary cores spin on it and only then start their own setup.
//!
//! # Ordering
//!
//! ```text
//! primary                          secondary
//! -------                          ---------
//! fill shared tables
//! open(): store(true, Release)
//!         publish barrier   ---->  await_open(): load(Relaxed) until true
//!                                                fence(Acquire)
//!                                  read shared tables
//! ```
//!
//! Everything the primary wrote before `open()` is visible to a secondary
//! after `await_open()` returns.

use core::sync::atomic::{AtomicBool, Ordering};

use tern_arch::{barrier, cache, cpu};
use tern_common::CoreId;

pub struct CoreReleaseGate {
    open: AtomicBool,
}

impl CoreReleaseGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    /// Release every waiting secondary core.
    ///
    /// Primary only, at most once.
    pub fn open(&self, core: CoreId) {
        debug_assert!(core.is_primary(), "release gate opened by {:?}", core);
        let was_open = self.open.swap(true, Ordering::Release);
        debug_assert!(!was_open, "release gate opened twice");

        // Secondaries may still poll with caches off
        cache::clean_invalidate_line(&self.open);
        barrier::publish(&self.open);
    }

    /// Block until [`open`](Self::open) has been called.
    pub fn await_open(&self) {
        while !self.open.load(Ordering::Relaxed) {
            cpu::wait_for_event();
        }
        barrier::read_barrier();
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl Default for CoreReleaseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_starts_closed() {
        let gate = CoreReleaseGate::new();
        assert!(!gate.is_open());
        gate.open(CoreId::PRIMARY);
        assert!(gate.is_open());
        // Already open: returns immediately
        gate.await_open();
    }

    #[test]
    #[should_panic(expected = "opened twice")]
    fn test_double_open_is_caught() {
        let gate = CoreReleaseGate::new();
        gate.open(CoreId::PRIMARY);
        gate.open(CoreId::PRIMARY);
    }

    #[test]
    #[should_panic(expected = "opened by")]
    fn test_secondary_open_is_caught() {
        let gate = CoreReleaseGate::new();
        gate.open(CoreId::new(1));
    }

    struct Shared {
        gate: CoreReleaseGate,
        // Written relaxed before open(); must be visible after await_open()
        payload: [AtomicU64; 4],
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_writes_before_open_are_visible(
            values in prop::array::uniform4(1u64..u64::MAX),
            primary_delay_us in 0u64..200,
            secondary_delays_us in prop::collection::vec(0u64..200, 1..4),
        ) {
            let shared = Arc::new(Shared {
                gate: CoreReleaseGate::new(),
                payload: Default::default(),
            });

            let readers: Vec<_> = secondary_delays_us
                .into_iter()
                .map(|delay| {
                    let shared = Arc::clone(&shared);
                    thread::spawn(move || {
                        thread::sleep(Duration::from_micros(delay));
                        shared.gate.await_open();
                        shared.payload.each_ref().map(|v| v.load(Ordering::Relaxed))
                    })
                })
                .collect();

            thread::sleep(Duration::from_micros(primary_delay_us));
            for (slot, value) in shared.payload.iter().zip(values) {
                slot.store(value, Ordering::Relaxed);
            }
            shared.gate.open(CoreId::PRIMARY);

            for reader in readers {
                let seen = reader.join().unwrap();
                prop_assert_eq!(seen, values);
            }
        }
    }
}
