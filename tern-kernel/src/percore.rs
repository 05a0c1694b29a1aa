//! Per-core values.
//!
//! A [`PerCore`] holds one lazily built `T` per possible core, indexed by
//! logical core id. Each slot belongs to its core: the value is built and
//! used there and never handed to another core, so `T` may hold `Cell`s
//! (as the timers do) while the arena itself lives in a `static`.

use spin::Once;
use tern_common::{CoreId, MAX_CORES};

pub struct PerCore<T> {
    slots: [Once<T>; MAX_CORES],
}

// SAFETY: Slots are only reached through the unsafe accessors, whose
// callers promise to be running on the slot's core. No slot is ever
// touched by two cores, so only moving a `T` between cores is required.
unsafe impl<T: Send> Sync for PerCore<T> {}

impl<T> PerCore<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { Once::new() }; MAX_CORES],
        }
    }

    /// The value of `core`, built with `init` on first use. `None` if
    /// `core` is out of range.
    ///
    /// # Safety
    ///
    /// Must be called on `core`, and the reference must not be shared with
    /// another core.
    pub unsafe fn get_or_init(&self, core: CoreId, init: impl FnOnce() -> T) -> Option<&T> {
        self.slots.get(core.index()).map(|slot| slot.call_once(init))
    }

    /// The value of `core`, if it was built.
    ///
    /// # Safety
    ///
    /// See [`get_or_init`](Self::get_or_init).
    pub unsafe fn get(&self, core: CoreId) -> Option<&T> {
        self.slots.get(core.index())?.get()
    }

    /// Whether `core`'s value has been built.
    #[must_use]
    pub fn is_initialised(&self, core: CoreId) -> bool {
        self.slots
            .get(core.index())
            .is_some_and(|slot| slot.is_completed())
    }
}

impl<T> Default for PerCore<T> {
    fn default() -> Self {
        Self::new()
    }
}
