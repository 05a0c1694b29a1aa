//! AArch64 CPU-Local Setup
//!
//! System register operations performed once per core during bring-up:
//! vector base, kernel stack pointer slot, FP/SIMD probe and trap control,
//! and EL0 counter access.

use core::arch::asm;

use aarch64_cpu::registers::{CPACR_EL1, ID_AA64PFR0_EL1, MPIDR_EL1, TPIDR_EL1, VBAR_EL1};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

/// Install the exception vector table.
///
/// # Safety
///
/// `base` must be the 2KB-aligned address of a valid vector table that
/// stays mapped for the life of the kernel.
pub unsafe fn install_vectors(base: u64) {
    VBAR_EL1.set(base);
    crate::barrier::isb();
}

/// Record the kernel stack top for exception entry.
///
/// The entry path loads SP from TPIDR_EL1, so this must be set before the
/// first exception can be taken from EL0.
pub fn set_kernel_stack(top: u64) {
    TPIDR_EL1.set(top);
}

/// Whether the core implements FP/SIMD.
///
/// ID_AA64PFR0_EL1.FP reads 0xF when floating point is not implemented.
#[must_use]
pub fn fpu_present() -> bool {
    ID_AA64PFR0_EL1.read(ID_AA64PFR0_EL1::FP) != 0xF
}

/// Trap FP/SIMD at EL0 and EL1.
///
/// Lazy FPU switching starts with the unit disabled on every core.
pub fn disable_fpu() {
    CPACR_EL1.modify(CPACR_EL1::FPEN::TrapEl0El1);
    crate::barrier::isb();
}

/// CNTKCTL_EL1.EL0VCTEN
const CNTKCTL_EL0VCTEN: u64 = 1 << 1;

/// Let EL0 read the virtual counter.
///
/// Everything else in CNTKCTL_EL1 is left trapped.
pub fn init_user_access() {
    let mut cntkctl: u64;
    // SAFETY: CNTKCTL_EL1 only controls EL0 timer access
    unsafe {
        asm!("mrs {}, cntkctl_el1", out(reg) cntkctl, options(nomem, nostack, preserves_flags));
    }
    cntkctl |= CNTKCTL_EL0VCTEN;
    // SAFETY: See above
    unsafe {
        asm!("msr cntkctl_el1, {}", in(reg) cntkctl, options(nomem, nostack, preserves_flags));
    }
}

/// MPIDR affinity 0, the hardware thread id on flat topologies.
#[must_use]
pub fn hart_id() -> usize {
    (MPIDR_EL1.get() & 0xFF) as usize
}
