//! Per-core kernel stacks.

use core::cell::UnsafeCell;

use tern_common::{CoreId, MAX_CORES};

/// log2 of the kernel stack size.
pub const KERNEL_STACK_BITS: u32 = 12;

pub const KERNEL_STACK_SIZE: usize = 1 << KERNEL_STACK_BITS;

#[repr(C, align(4096))]
struct Stack([u8; KERNEL_STACK_SIZE]);

const _: () = assert!(core::mem::align_of::<Stack>() == KERNEL_STACK_SIZE);

/// Stack arena, one stack per possible core.
pub struct KernelStacks {
    stacks: UnsafeCell<[Stack; MAX_CORES]>,
}

// SAFETY: The kernel never reads or writes the arena through this type;
// it only hands out addresses, and each stack is used by exactly one core.
unsafe impl Sync for KernelStacks {}

impl KernelStacks {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stacks: UnsafeCell::new([const { Stack([0; KERNEL_STACK_SIZE]) }; MAX_CORES]),
        }
    }

    /// Initial stack pointer for `core`, or `None` if out of range.
    ///
    /// With `tag_core` the logical core id is OR'd into the low bits of
    /// the (stack-size aligned) top, for platforms whose exception entry
    /// recovers the core id from the stack register.
    #[must_use]
    pub fn top(&self, core: CoreId, tag_core: bool) -> Option<u64> {
        if core.index() >= MAX_CORES {
            return None;
        }
        let base = self.stacks.get() as usize as u64;
        let top = base + ((core.index() + 1) * KERNEL_STACK_SIZE) as u64;
        Some(if tag_core {
            top | core.index() as u64
        } else {
            top
        })
    }
}

impl Default for KernelStacks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tops_are_aligned_and_disjoint() {
        let stacks = Box::new(KernelStacks::new());
        let t0 = stacks.top(CoreId::new(0), false).unwrap();
        let t1 = stacks.top(CoreId::new(1), false).unwrap();
        assert_eq!(t0 % KERNEL_STACK_SIZE as u64, 0);
        assert_eq!(t1 - t0, KERNEL_STACK_SIZE as u64);
    }

    #[test]
    fn test_core_tag_in_low_bits() {
        let stacks = Box::new(KernelStacks::new());
        let plain = stacks.top(CoreId::new(3), false).unwrap();
        let tagged = stacks.top(CoreId::new(3), true).unwrap();
        assert_eq!(tagged, plain | 3);
        assert_eq!(tagged & !(KERNEL_STACK_SIZE as u64 - 1), plain);
    }

    #[test]
    fn test_out_of_range() {
        let stacks = Box::new(KernelStacks::new());
        assert_eq!(stacks.top(CoreId::new(MAX_CORES), false), None);
    }
}
