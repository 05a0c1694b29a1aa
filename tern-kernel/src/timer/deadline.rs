//! Deadline (tickless) timer.
//!
//! The compare register holds the absolute time of the next scheduling
//! event. The interrupt is masked between events: `acknowledge()` masks it
//! and the scheduler unmasks it once it has programmed the next deadline.

use core::cell::Cell;

use tern_pal::{TimerControl, TimerRegisters};

use super::{Ticks, TimeSource};

pub struct DeadlineTimer<R> {
    regs: R,
    /// Latest counter value handed out by `now()`, if any.
    last_now: Cell<Option<Ticks>>,
}

impl<R: TimerRegisters> DeadlineTimer<R> {
    #[must_use]
    pub const fn new(regs: R) -> Self {
        Self {
            regs,
            last_now: Cell::new(None),
        }
    }

    #[must_use]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Current time.
    pub fn now(&self) -> Ticks {
        let now = self.regs.counter();
        self.last_now.set(Some(now));
        now
    }

    /// Earliest deadline `arm` accepts: the last `now()`, or the live
    /// counter if time was never read.
    fn floor(&self) -> Ticks {
        match self.last_now.get() {
            Some(now) => now,
            None => self.now(),
        }
    }

    /// Program the next event at absolute time `deadline`.
    ///
    /// `deadline` must not be earlier than the last [`now`](Self::now),
    /// or than the counter if `now` was never called. The interrupt mask
    /// is left as it is.
    pub fn arm(&self, deadline: Ticks) {
        debug_assert!(
            deadline >= self.floor(),
            "deadline {} is before current time {}",
            deadline,
            self.floor()
        );
        self.regs.set_compare(deadline);
        let ctl = self.regs.control() & TimerControl::IMASK;
        self.regs.set_control(ctl | TimerControl::ENABLE);
    }

    /// Let the timer interrupt through.
    pub fn unmask(&self) {
        let ctl = self.regs.control() & !TimerControl::IMASK & !TimerControl::ISTATUS;
        self.regs.set_control(ctl);
    }

    /// Stop the timer interrupt without disarming the deadline.
    pub fn mask(&self) {
        let ctl = self.regs.control() & !TimerControl::ISTATUS;
        self.regs.set_control(ctl | TimerControl::IMASK);
    }

    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.regs.control().contains(TimerControl::IMASK)
    }
}

impl<R: TimerRegisters> TimeSource for DeadlineTimer<R> {
    const TICKLESS: bool = true;

    /// Enabled but masked; the scheduler arms and unmasks it.
    fn init(&self) {
        self.last_now.set(Some(self.regs.counter()));
        self.regs.set_control(TimerControl::ENABLE | TimerControl::IMASK);
    }

    /// Masks the interrupt and waits for the write to land, so the line
    /// is deasserted before interrupts are re-enabled.
    fn acknowledge(&self) {
        self.regs.set_control(TimerControl::ENABLE | TimerControl::IMASK);
        self.regs.sync();
    }

    fn handoff_time(&self) -> Option<Ticks> {
        Some(self.now())
    }
}
