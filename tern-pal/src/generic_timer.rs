//! ARM Generic Timer
//!
//! The EL1 virtual timer (`CNTV_*`), which is what the kernel uses both
//! natively and as a guest.

use aarch64_cpu::registers::{CNTFRQ_EL0, CNTV_CTL_EL0, CNTV_CVAL_EL0, CNTV_TVAL_EL0, CNTVCT_EL0};
use tock_registers::interfaces::{Readable, Writeable};

use crate::timer::{TimerControl, TimerRegisters};

/// PPI of the EL1 virtual timer.
pub const VIRTUAL_TIMER_PPI: u32 = 27;

/// Handle to the current core's virtual timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericTimer;

impl GenericTimer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TimerRegisters for GenericTimer {
    fn counter(&self) -> u64 {
        CNTVCT_EL0.get()
    }

    fn compare(&self) -> u64 {
        CNTV_CVAL_EL0.get()
    }

    fn set_compare(&self, value: u64) {
        CNTV_CVAL_EL0.set(value);
    }

    fn control(&self) -> TimerControl {
        TimerControl::from_bits_truncate(CNTV_CTL_EL0.get())
    }

    fn set_control(&self, ctl: TimerControl) {
        CNTV_CTL_EL0.set(ctl.bits());
    }

    fn set_countdown(&self, ticks: u32) {
        CNTV_TVAL_EL0.set(u64::from(ticks));
    }

    fn frequency(&self) -> u64 {
        CNTFRQ_EL0.get()
    }

    fn sync(&self) {
        tern_arch::barrier::isb();
    }
}
