//! CPU Control
//!
//! Halting and event signalling. Each function picks the
//! native instruction for the target and falls back to a portable
//! equivalent on hosted builds, so code above this crate never needs `cfg`.

#[cfg(any(target_arch = "aarch64", target_arch = "riscv64"))]
use core::arch::asm;

/// Halt this core forever.
///
/// Used as the terminal action of a failed boot. Interrupts are expected to
/// be masked, so the core never leaves the wait.
#[inline]
pub fn halt() -> ! {
    loop {
        wait_for_interrupt();
    }
}

/// Wait for interrupt (WFI).
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(any(target_arch = "aarch64", target_arch = "riscv64"))]
    // SAFETY: WFI is always safe to call
    unsafe {
        asm!("wfi", options(nomem, nostack));
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "riscv64")))]
    core::hint::spin_loop();
}

/// Park briefly while polling a flag another core will set.
///
/// On AArch64 this is WFE, paired with [`send_event`] on the writer. The
/// event register may already be set, so callers must re-check the flag.
#[inline]
pub fn wait_for_event() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: WFE is always safe to call
    unsafe {
        asm!("wfe", options(nomem, nostack));
    }

    #[cfg(not(target_arch = "aarch64"))]
    core::hint::spin_loop();
}

/// Wake every core sitting in [`wait_for_event`] (SEV).
#[inline]
pub fn send_event() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: SEV is always safe to call
    unsafe {
        asm!("sev", options(nomem, nostack));
    }
}
