//! Hart Map
//!
//! Which hardware thread each logical core runs on. Each core records its
//! own slot during bring-up, before it reaches the release gate (primary)
//! or right after entry (secondaries). IPI delivery needs the reverse
//! direction, hence [`HartMap::core_of`].

use core::sync::atomic::{AtomicUsize, Ordering};

use tern_common::{CoreId, HartId, MAX_CORES};

/// Marks a slot no core has recorded yet.
const UNRECORDED: usize = usize::MAX;

pub struct HartMap {
    harts: [AtomicUsize; MAX_CORES],
}

impl HartMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            harts: [const { AtomicUsize::new(UNRECORDED) }; MAX_CORES],
        }
    }

    /// Record that `core` runs on `hart`. Called by `core` itself.
    ///
    /// Out-of-range cores are ignored; the boot sequence rejects them
    /// before getting here.
    pub fn record(&self, core: CoreId, hart: HartId) {
        if let Some(slot) = self.harts.get(core.index()) {
            slot.store(hart, Ordering::Release);
        }
    }

    #[must_use]
    pub fn hart_of(&self, core: CoreId) -> Option<HartId> {
        let hart = self.harts.get(core.index())?.load(Ordering::Acquire);
        (hart != UNRECORDED).then_some(hart)
    }

    #[must_use]
    pub fn core_of(&self, hart: HartId) -> Option<CoreId> {
        self.harts
            .iter()
            .position(|slot| slot.load(Ordering::Acquire) == hart)
            .map(CoreId::new)
    }
}

impl Default for HartMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_lookup() {
        let map = HartMap::new();
        map.record(CoreId::new(0), 3);
        map.record(CoreId::new(1), 0);

        assert_eq!(map.hart_of(CoreId::new(0)), Some(3));
        assert_eq!(map.core_of(0), Some(CoreId::new(1)));
        assert_eq!(map.hart_of(CoreId::new(2)), None);
        assert_eq!(map.core_of(7), None);
    }

    #[test]
    fn test_out_of_range_core_ignored() {
        let map = HartMap::new();
        map.record(CoreId::new(MAX_CORES), 1);
        assert_eq!(map.core_of(1), None);
        assert_eq!(map.hart_of(CoreId::new(MAX_CORES)), None);
    }
}
