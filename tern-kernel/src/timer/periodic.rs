//! Periodic tick timer.

use tern_pal::{TimerControl, TimerRegisters};

use super::{Ticks, TimeSource};

/// Countdown value for a tick of `tick_ms` at `frequency` Hz.
///
/// Saturates at the width of the countdown register.
#[must_use]
pub fn reload_ticks(frequency: u64, tick_ms: u64) -> u32 {
    let ticks = frequency.saturating_mul(tick_ms) / 1_000;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

pub struct PeriodicTimer<R> {
    regs: R,
    reload: u32,
}

impl<R: TimerRegisters> PeriodicTimer<R> {
    #[must_use]
    pub const fn new(regs: R, reload: u32) -> Self {
        Self { regs, reload }
    }

    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    #[must_use]
    pub const fn reload(&self) -> u32 {
        self.reload
    }

    /// Start the next tick.
    pub fn reset(&self) {
        self.regs.set_countdown(self.reload);
        self.regs.sync();
    }
}

impl<R: TimerRegisters> TimeSource for PeriodicTimer<R> {
    const TICKLESS: bool = false;

    /// Load the first tick and enable the interrupt.
    fn init(&self) {
        self.reset();
        self.regs.set_control(TimerControl::ENABLE);
    }

    /// Re-arming the countdown clears the condition.
    fn acknowledge(&self) {
        self.reset();
    }

    fn handoff_time(&self) -> Option<Ticks> {
        None
    }
}
