//! Kernel Timer
//!
//! Two disciplines, selected at build time:
//! - [`PeriodicTimer`]: fixed tick, re-armed on every interrupt
//! - [`DeadlineTimer`]: tickless; the scheduler programs an absolute
//!   deadline for the next event (the `mcs` feature)
//!
//! [`KernelTimer`] names whichever one this build uses. Only the selected
//! variant is compiled outside of tests.

use tern_pal::TimerRegisters;

#[cfg(any(feature = "mcs", test))]
mod deadline;
#[cfg(any(not(feature = "mcs"), test))]
mod periodic;

#[cfg(any(feature = "mcs", test))]
pub use deadline::DeadlineTimer;
#[cfg(any(not(feature = "mcs"), test))]
pub use periodic::{PeriodicTimer, reload_ticks};

/// Monotonic timer ticks.
pub type Ticks = u64;

/// Kernel tick length of the periodic discipline.
pub const TIMER_TICK_MS: u64 = 2;

/// The timer discipline of this build.
#[cfg(feature = "mcs")]
pub type KernelTimer<R> = DeadlineTimer<R>;

/// The timer discipline of this build.
#[cfg(not(feature = "mcs"))]
pub type KernelTimer<R> = PeriodicTimer<R>;

/// What the boot sequence needs from a timer discipline.
pub trait TimeSource {
    /// Whether the scheduler is tickless and expects a starting time.
    const TICKLESS: bool;

    /// Per-core timer setup. Runs last in CPU-local init.
    fn init(&self);

    /// Clear the pending timer interrupt.
    fn acknowledge(&self);

    /// The time to seed the scheduler's clock with, read once at the end
    /// of boot. `None` for tick-driven timers.
    fn handoff_time(&self) -> Option<Ticks>;
}

/// Build the kernel timer for this build from a register set.
#[cfg(feature = "mcs")]
pub fn kernel_timer<R: TimerRegisters>(regs: R) -> KernelTimer<R> {
    DeadlineTimer::new(regs)
}

/// Build the kernel timer for this build from a register set.
///
/// The periodic reload is derived from the counter frequency.
#[cfg(not(feature = "mcs"))]
pub fn kernel_timer<R: TimerRegisters>(regs: R) -> KernelTimer<R> {
    let reload = reload_ticks(regs.frequency(), TIMER_TICK_MS);
    PeriodicTimer::new(regs, reload)
}
