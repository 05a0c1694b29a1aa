//! RV64 Supervisor-Mode Setup
//!
//! CSR operations performed once per hart during bring-up, plus the two
//! legacy SBI calls the early kernel needs before any driver exists.

use core::arch::asm;

/// sstatus.FS field
const SSTATUS_FS: u64 = 0b11 << 13;
/// sstatus.FS = Initial
const SSTATUS_FS_INITIAL: u64 = 0b01 << 13;

/// Install the trap vector (direct mode).
///
/// # Safety
///
/// `base` must be the 4-byte aligned address of a trap entry that stays
/// mapped for the life of the kernel.
pub unsafe fn install_vectors(base: u64) {
    // SAFETY: Caller guarantees base is a valid trap entry
    unsafe {
        asm!("csrw stvec, {}", in(reg) base & !0b11, options(nomem, nostack));
    }
}

/// Record the kernel stack top for trap entry (sscratch).
pub fn set_kernel_stack(top: u64) {
    // SAFETY: sscratch is only read by our own trap entry
    unsafe {
        asm!("csrw sscratch, {}", in(reg) top, options(nomem, nostack));
    }
}

/// Whether the hart implements the F/D extensions.
///
/// sstatus.FS is WARL and hardwired to Off without an FPU, so write
/// Initial and read it back. The field is restored to Off before returning.
#[must_use]
pub fn fpu_present() -> bool {
    let sstatus: u64;
    // SAFETY: Toggling sstatus.FS only changes FP trap behaviour
    unsafe {
        asm!(
            "csrs sstatus, {fs}",
            "csrr {out}, sstatus",
            fs = in(reg) SSTATUS_FS_INITIAL,
            out = out(reg) sstatus,
            options(nomem, nostack)
        );
    }
    disable_fpu();
    sstatus & SSTATUS_FS != 0
}

/// Trap FP use by setting sstatus.FS to Off.
pub fn disable_fpu() {
    // SAFETY: See fpu_present
    unsafe {
        asm!("csrc sstatus, {}", in(reg) SSTATUS_FS, options(nomem, nostack));
    }
}

/// Legacy SBI extension ids.
mod sbi {
    pub const SET_TIMER: usize = 0x00;
    pub const CONSOLE_PUTCHAR: usize = 0x01;
}

#[inline]
fn sbi_call(eid: usize, arg0: usize) -> isize {
    let ret: isize;
    // SAFETY: Legacy SBI calls only clobber a0
    unsafe {
        asm!(
            "ecall",
            inlateout("a0") arg0 => ret,
            in("a7") eid,
            options(nostack)
        );
    }
    ret
}

/// Program the next supervisor timer interrupt at absolute time `when`.
pub fn sbi_set_timer(when: u64) {
    sbi_call(sbi::SET_TIMER, when as usize);
}

/// Write one byte to the SBI console.
pub fn sbi_putchar(c: u8) {
    sbi_call(sbi::CONSOLE_PUTCHAR, c as usize);
}

/// Read the `time` CSR.
#[must_use]
pub fn read_time() -> u64 {
    let time: u64;
    // SAFETY: rdtime has no side effects
    unsafe {
        asm!("rdtime {}", out(reg) time, options(nomem, nostack));
    }
    time
}

/// sie.STIE
const SIE_STIE: u64 = 1 << 5;

/// Enable or disable the supervisor timer interrupt (sie.STIE).
pub fn set_timer_interrupt(enabled: bool) {
    // SAFETY: sie only gates interrupt delivery to this hart
    unsafe {
        if enabled {
            asm!("csrs sie, {}", in(reg) SIE_STIE, options(nomem, nostack));
        } else {
            asm!("csrc sie, {}", in(reg) SIE_STIE, options(nomem, nostack));
        }
    }
}

/// Whether sie.STIE is set.
#[must_use]
pub fn timer_interrupt_enabled() -> bool {
    let sie: u64;
    // SAFETY: Reading sie has no side effects
    unsafe {
        asm!("csrr {}, sie", out(reg) sie, options(nomem, nostack));
    }
    sie & SIE_STIE != 0
}

/// Whether sip.STIP is set.
#[must_use]
pub fn timer_interrupt_pending() -> bool {
    let sip: u64;
    // SAFETY: Reading sip has no side effects
    unsafe {
        asm!("csrr {}, sip", out(reg) sip, options(nomem, nostack));
    }
    sip & SIE_STIE != 0
}

/// sie.SSIE
const SIE_SSIE: u64 = 1 << 1;

/// Enable or disable supervisor software interrupts (sie.SSIE), which
/// carry inter-processor interrupts on SBI platforms.
pub fn set_software_interrupt(enabled: bool) {
    // SAFETY: sie only gates interrupt delivery to this hart
    unsafe {
        if enabled {
            asm!("csrs sie, {}", in(reg) SIE_SSIE, options(nomem, nostack));
        } else {
            asm!("csrc sie, {}", in(reg) SIE_SSIE, options(nomem, nostack));
        }
    }
}

/// Clear a pending supervisor software interrupt (sip.SSIP).
pub fn clear_software_interrupt() {
    // SAFETY: Clearing SSIP only acknowledges this hart's own IPI
    unsafe {
        asm!("csrc sip, {}", in(reg) SIE_SSIE, options(nomem, nostack));
    }
}
