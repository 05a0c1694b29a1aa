//! Platform Abstraction
//!
//! The per-board hooks the boot sequence calls. Interrupt controller and
//! timer live behind their own traits ([`IrqController`](crate::irq::IrqController),
//! [`TimerRegisters`](crate::timer::TimerRegisters)); this trait covers the
//! rest of CPU-local and board-level bring-up.

use tern_common::CoreId;

use crate::console;

pub trait Platform: Sync {
    /// Whether the kernel stack top carries the logical core id in its low
    /// bits, so exception entry can recover the core without a memory load.
    const TAGS_STACK_WITH_CORE: bool = false;

    /// Get the platform name
    fn name(&self) -> &'static str;

    /// CPU errata workarounds. Runs first on every core.
    fn apply_errata(&self, _core: CoreId) {}

    /// Point this core's exception/trap vector at the kernel's table.
    fn install_vectors(&self, core: CoreId);

    /// Record the kernel stack top used on exception entry.
    fn set_kernel_stack(&self, core: CoreId, top: u64);

    /// Whether this core has FP/SIMD hardware.
    fn has_hw_fpu(&self) -> bool;

    /// Trap FP/SIMD use until a thread needs it.
    fn disable_fpu(&self);

    /// Expose user-visible CPU features (counter access etc.).
    fn init_user_access(&self) {}

    /// Outer cache setup. Primary core, once.
    fn init_l2_cache(&self) {}

    /// Write a diagnostic to the early console.
    fn early_puts(&self, s: &str) {
        console::puts(s);
    }

    /// Stop this core for good.
    fn halt(&self) -> ! {
        tern_arch::halt()
    }
}
