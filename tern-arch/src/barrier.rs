//! Memory Barrier Helpers
//!
//! Ordering primitives for the boot handshake and for timer/interrupt
//! controller register sequences.
//!
//! - `read_barrier()`: acquire fence
//! - `isb()`: instruction synchronisation; system register writes before it
//!   take effect before anything after it
//! - `publish()`: make prior stores visible to cores that are still running
//!   on the loader's page tables
//!
//! # Usage Pattern
//!
//! ```ignore
//! // Writer (primary core)
//! TABLE.fill();
//! FLAG.store(true, Ordering::Release);
//! barrier::publish(&FLAG);
//!
//! // Reader (secondary core)
//! while !FLAG.load(Ordering::Relaxed) {}
//! barrier::read_barrier();
//! TABLE.read();
//! ```

use core::sync::atomic::{Ordering, fence};

/// Read barrier (acquire semantics).
#[inline]
pub fn read_barrier() {
    fence(Ordering::Acquire);
}

/// Instruction Synchronisation Barrier.
///
/// On AArch64 this is `isb`; it guarantees a preceding timer control write
/// has reached the timer (and its interrupt line deasserted) before the
/// following instructions run. RISC-V has no equivalent for CSR side
/// effects beyond in-order CSR access, so only the compiler is fenced.
#[inline]
pub fn isb() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: ISB is always safe to execute
    unsafe {
        core::arch::asm!("isb", options(nostack, preserves_flags));
    }

    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::compiler_fence(Ordering::SeqCst);
}

/// Inner-shareable data synchronisation barrier.
#[inline]
pub fn dsb_ish() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: DSB ISH is always safe to execute
    unsafe {
        core::arch::asm!("dsb ish", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    // SAFETY: FENCE is always safe to execute
    unsafe {
        core::arch::asm!("fence rw, rw", options(nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "riscv64")))]
    fence(Ordering::SeqCst);
}

/// Publish a flag store to other cores.
///
/// Call after the release store of a flag that other cores poll. Orders the
/// store against everything that follows and, on AArch64, wakes cores parked
/// in WFE. The loaders for both supported architectures map boot memory
/// cacheable and inner shareable, so no cache maintenance is needed here;
/// see [`crate::cache::clean_invalidate_line`] for platforms where it is.
#[inline]
pub fn publish<T>(flag: &T) {
    let _ = flag;

    #[cfg(target_arch = "aarch64")]
    {
        dsb_ish();
        crate::cpu::send_event();
    }

    #[cfg(target_arch = "riscv64")]
    // SAFETY: FENCE is always safe to execute
    unsafe {
        // fence w,r: the flag store is ordered before any later load
        core::arch::asm!("fence w, r", options(nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "riscv64")))]
    fence(Ordering::SeqCst);
}
