//! Timer Register Access
//!
//! [`TimerRegisters`] is the hardware seam for the kernel timer. It mirrors
//! the ARM generic timer's register set (counter, compare value, control,
//! countdown) because that is the richer of the two supported timers; the
//! SBI timer maps onto it.
//!
//! Implementations:
//! - [`GenericTimer`](crate::generic_timer::GenericTimer): AArch64 `CNTV_*`
//! - [`SbiTimer`](crate::sbi_timer::SbiTimer): RV64 `time` CSR + SBI

bitflags::bitflags! {
    /// Timer control register (`CNTx_CTL` layout).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TimerControl: u64 {
        /// Timer enabled.
        const ENABLE = 1 << 0;
        /// Interrupt masked.
        const IMASK = 1 << 1;
        /// Condition met (read only).
        const ISTATUS = 1 << 2;
    }
}

/// Per-core timer registers.
///
/// Methods take `&self`; a timer is only ever accessed by the core that
/// owns it.
pub trait TimerRegisters {
    /// Free-running counter.
    fn counter(&self) -> u64;

    /// Absolute compare value.
    fn compare(&self) -> u64;

    fn set_compare(&self, value: u64);

    fn control(&self) -> TimerControl;

    fn set_control(&self, ctl: TimerControl);

    /// Fire `ticks` from now (`CNTx_TVAL`).
    fn set_countdown(&self, ticks: u32);

    /// Counter frequency in Hz.
    fn frequency(&self) -> u64;

    /// Wait until preceding register writes have taken effect.
    fn sync(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bits_match_hardware() {
        assert_eq!(TimerControl::ENABLE.bits(), 0b001);
        assert_eq!(TimerControl::IMASK.bits(), 0b010);
        assert_eq!(TimerControl::ISTATUS.bits(), 0b100);
        let ctl = TimerControl::from_bits_truncate(0b111);
        assert!(ctl.contains(TimerControl::ENABLE | TimerControl::IMASK));
    }
}
