//! Data Cache Maintenance
//!
//! Only what the boot handshake needs: cleaning the line that holds a flag
//! so a core running with caches off (or on a non-coherent boot mapping)
//! reads the new value from memory.
//!
//! # Cache Line Size
//!
//! On AArch64 the line size comes from `CTR_EL0.DminLine` and is cached
//! after the first read. Other targets report a conservative 64 bytes.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Cached line size; 0 means not yet read.
static CACHE_LINE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Fallback when the hardware cannot be queried.
const DEFAULT_LINE_SIZE: usize = 64;

/// Data cache minimum line size in bytes.
#[inline]
#[must_use]
pub fn cache_line_size() -> usize {
    let cached = CACHE_LINE_SIZE.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }

    let line_size = read_line_size();
    CACHE_LINE_SIZE.store(line_size, Ordering::Relaxed);
    line_size
}

#[cfg(target_arch = "aarch64")]
fn read_line_size() -> usize {
    let ctr: u64;
    // SAFETY: Reading CTR_EL0 has no side effects
    unsafe {
        core::arch::asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack, preserves_flags));
    }

    // DminLine is log2 of words per line, a word being 4 bytes
    let dmin_line = ((ctr >> 16) & 0xF) as usize;
    4 << dmin_line
}

#[cfg(not(target_arch = "aarch64"))]
fn read_line_size() -> usize {
    DEFAULT_LINE_SIZE
}

/// Align an address down to its cache line.
#[inline]
#[must_use]
pub fn line_base(addr: usize) -> usize {
    addr & !(cache_line_size() - 1)
}

/// Clean and invalidate the data cache line containing `ptr` to the point
/// of coherency, then wait for completion.
///
/// A no-op on targets whose boot memory is always coherent.
#[inline]
pub fn clean_invalidate_line<T>(ptr: *const T) {
    let addr = line_base(ptr as usize);

    #[cfg(target_arch = "aarch64")]
    // SAFETY: DC CIVAC on a mapped address only affects cache state; the
    // pointer comes from a live reference in every caller
    unsafe {
        core::arch::asm!(
            "dc civac, {addr}",
            "dsb sy",
            addr = in(reg) addr,
            options(nostack)
        );
    }

    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = addr;
        core::sync::atomic::fence(Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_size_is_power_of_two() {
        let size = cache_line_size();
        assert!(size.is_power_of_two());
        assert_eq!(cache_line_size(), size);
    }

    #[test]
    fn test_line_base_alignment() {
        let size = cache_line_size();
        assert_eq!(line_base(size * 3 + 5), size * 3);
        assert_eq!(line_base(size * 3), size * 3);
    }
}
