//! Generic kernel collaborators.
//!
//! The bring-up sequence drives these but does not implement them: page
//! tables, the initial thread, FPU and VCPU state, and the scheduler all
//! belong to the rest of the kernel.

use tern_common::{BootParams, CoreId};

use crate::error::SetupError;
use crate::timer::Ticks;

pub trait Kernel: Sync {
    /// Build the kernel's own address space. Primary core, before anything
    /// else that needs kernel virtual addresses.
    fn map_kernel_window(&self);

    /// Switch this core onto the kernel's page tables.
    fn activate_kernel_vspace(&self);

    /// Everything generic: free memory, root capabilities, the initial
    /// thread. Primary core, once.
    fn setup_kernel(&self, params: &BootParams) -> Result<(), SetupError>;

    /// Per-core part of generic setup (idle thread, scheduler queues).
    fn setup_kernel_on_secondary_core(&self, core: CoreId);

    /// FP/SIMD state management setup. Returns `false` on failure.
    fn init_fpu(&self) -> bool;

    /// Hypervisor builds: VCPU state for this core.
    fn vcpu_boot_init(&self) {}

    /// Hypervisor builds: whether the EL2 translation setup is usable.
    fn check_hyp_config(&self) -> bool {
        true
    }

    /// Debug builds: reset breakpoints/watchpoints. Returns `false` if the
    /// core cannot support them reliably.
    fn init_hw_breakpoints(&self) -> bool {
        true
    }

    /// Benchmark builds: start the cycle counter.
    fn init_cycle_counter(&self) {}

    /// SMMU builds: bring up the SMMU. Primary core, once.
    fn smmu_init(&self) {}

    /// Deadline builds: seed this core's scheduler clock.
    fn init_node_clock(&self, core: CoreId, now: Ticks, consumed: Ticks);

    /// Pick the first thread to run on `core`.
    fn schedule(&self, core: CoreId);

    /// Switch to the chosen thread. Never returns.
    fn activate_thread(&self, core: CoreId) -> !;
}
