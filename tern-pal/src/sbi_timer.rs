//! SBI Timer
//!
//! The RV64 supervisor timer, expressed as [`TimerRegisters`]. The counter
//! is the `time` CSR; the compare value is whatever was last handed to
//! `sbi_set_timer`; the control bits map onto `sie.STIE` (IMASK inverted),
//! `sip.STIP` (ISTATUS) and a far-future compare value (ENABLE cleared).

use core::cell::Cell;

use tern_arch::riscv64;

use crate::timer::{TimerControl, TimerRegisters};

/// Compare value that never fires.
const DISARMED: u64 = u64::MAX;

/// Handle to the current hart's supervisor timer.
pub struct SbiTimer {
    frequency: u64,
    compare: Cell<u64>,
}

impl SbiTimer {
    /// `frequency` is the `timebase-frequency` of the platform.
    #[must_use]
    pub const fn new(frequency: u64) -> Self {
        Self {
            frequency,
            compare: Cell::new(DISARMED),
        }
    }
}

impl TimerRegisters for SbiTimer {
    fn counter(&self) -> u64 {
        riscv64::read_time()
    }

    fn compare(&self) -> u64 {
        self.compare.get()
    }

    fn set_compare(&self, value: u64) {
        self.compare.set(value);
        riscv64::sbi_set_timer(value);
    }

    fn control(&self) -> TimerControl {
        let mut ctl = TimerControl::empty();
        ctl.set(TimerControl::ENABLE, self.compare.get() != DISARMED);
        ctl.set(TimerControl::IMASK, !riscv64::timer_interrupt_enabled());
        ctl.set(TimerControl::ISTATUS, riscv64::timer_interrupt_pending());
        ctl
    }

    fn set_control(&self, ctl: TimerControl) {
        riscv64::set_timer_interrupt(!ctl.contains(TimerControl::IMASK));
        if !ctl.contains(TimerControl::ENABLE) {
            self.set_compare(DISARMED);
        }
    }

    fn set_countdown(&self, ticks: u32) {
        let deadline = riscv64::read_time().wrapping_add(u64::from(ticks));
        self.set_compare(deadline);
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn sync(&self) {
        tern_arch::barrier::isb();
    }
}
