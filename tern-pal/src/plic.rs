//! PLIC (Platform-Level Interrupt Controller) Backend
//!
//! [`IrqController`] for RV64 platforms. External sources `1..=max_source`
//! go through the PLIC; source 0 means "no interrupt". The supervisor
//! timer and software (IPI) interrupts do not pass through the PLIC at all
//! and are numbered above the PLIC sources. Masking an IPI line toggles
//! the current hart's `sie.SSIE`. `sie.STIE` is the timer's own IMASK and
//! belongs to [`TimerRegisters`](crate::timer::TimerRegisters), so the
//! timer line is never masked here.
//!
//! # Register Layout
//!
//! | Offset                        | Register                  |
//! |-------------------------------|---------------------------|
//! | `0x0000 + 4 * src`            | source priority           |
//! | `0x2000 + 0x80 * ctx`         | enable bits for context   |
//! | `0x20_0000 + 0x1000 * ctx`    | priority threshold        |
//! | `0x20_0004 + 0x1000 * ctx`    | claim / complete          |

use core::ptr;

use tern_common::{CoreId, MAX_CORES};

use crate::irq::{Irq, IrqController};

const PRIORITY_BASE: usize = 0x0000;
const ENABLE_BASE: usize = 0x2000;
const ENABLE_STRIDE: usize = 0x80;
const CONTEXT_BASE: usize = 0x20_0000;
const CONTEXT_STRIDE: usize = 0x1000;
const CONTEXT_THRESHOLD: usize = 0x0;
const CONTEXT_CLAIM: usize = 0x4;

/// Line numbers of the hart-local interrupts that bypass the PLIC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HartLocalLines {
    pub timer: u32,
    pub remote_call_ipi: u32,
    pub reschedule_ipi: u32,
}

/// What masking a line at the PLIC backend writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MaskTarget {
    /// The PLIC enable bit of an external source.
    Source(u32),
    /// `sie.SSIE` of the current hart.
    SoftwareInterrupt,
    /// Nothing: the timer line, or a line this controller does not know.
    Untouched,
}

/// PLIC-backed interrupt controller.
pub struct PlicController {
    base: usize,
    max_source: u32,
    local: HartLocalLines,
    /// Supervisor-mode PLIC context of each core.
    contexts: [usize; MAX_CORES],
}

impl PlicController {
    /// Describe a PLIC at `base` with sources `1..=max_source`.
    ///
    /// `contexts[i]` is the supervisor context of logical core `i`; on
    /// QEMU virt this is `2 * hart + 1`.
    ///
    /// # Safety
    ///
    /// `base` must be the mapped address of the PLIC register block, used
    /// by no other driver.
    #[must_use]
    pub const unsafe fn new(
        base: usize,
        max_source: u32,
        local: HartLocalLines,
        contexts: [usize; MAX_CORES],
    ) -> Self {
        Self {
            base,
            max_source,
            local,
            contexts,
        }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: new() guarantees base maps the PLIC, and every offset
        // computed in this module lies inside its register block
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: See write()
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn context(&self, core: CoreId) -> usize {
        self.contexts[core.index()]
    }

    fn set_enable(&self, ctx: usize, source: u32, enabled: bool) {
        let word = ENABLE_BASE + ENABLE_STRIDE * ctx + 4 * (source as usize / 32);
        let bit = 1u32 << (source % 32);
        let current = self.read(word);
        let updated = if enabled { current | bit } else { current & !bit };
        self.write(word, updated);
    }

    fn is_external(&self, line: u32) -> bool {
        line != 0 && line <= self.max_source
    }

    fn mask_target(&self, line: u32) -> MaskTarget {
        if self.is_external(line) {
            MaskTarget::Source(line)
        } else if line == self.local.remote_call_ipi || line == self.local.reschedule_ipi {
            MaskTarget::SoftwareInterrupt
        } else {
            MaskTarget::Untouched
        }
    }
}

impl IrqController for PlicController {
    fn init_global(&self) {
        for source in 1..=self.max_source {
            self.write(PRIORITY_BASE + 4 * source as usize, 1);
        }
        log::debug!("plic: {} sources at priority 1", self.max_source);
    }

    fn init_local(&self, core: CoreId) {
        let ctx = self.context(core);
        for source in 1..=self.max_source {
            self.set_enable(ctx, source, false);
        }
        self.write(CONTEXT_BASE + CONTEXT_STRIDE * ctx + CONTEXT_THRESHOLD, 0);

        #[cfg(target_arch = "riscv64")]
        tern_arch::riscv64::set_software_interrupt(true);
    }

    fn set_masked(&self, irq: Irq, masked: bool) {
        match self.mask_target(irq.line) {
            MaskTarget::Source(source) => {
                self.set_enable(self.context(irq.core), source, !masked);
            }
            MaskTarget::SoftwareInterrupt => {
                #[cfg(target_arch = "riscv64")]
                tern_arch::riscv64::set_software_interrupt(!masked);
            }
            MaskTarget::Untouched => {}
        }
    }

    fn ack(&self, irq: Irq) {
        let line = irq.line;
        if self.is_external(line) {
            let ctx = self.context(irq.core);
            self.write(CONTEXT_BASE + CONTEXT_STRIDE * ctx + CONTEXT_CLAIM, line);
            return;
        }

        #[cfg(target_arch = "riscv64")]
        if line == self.local.remote_call_ipi || line == self.local.reschedule_ipi {
            tern_arch::riscv64::clear_software_interrupt();
        }
    }
}
