//! Physical and Virtual Address Types
//!
//! Simple address newtypes used in the bootloader hand-off. They give a
//! compile-time distinction between physical and virtual addresses without
//! any paging machinery.
//!
//! Arithmetic on these types wraps. The loader describes the user image with
//! an offset that may be "negative" when read as a signed value, and the
//! conversions must round-trip exactly for every input.

use core::fmt;

/// Size of a small page (4KB).
pub const PAGE_SIZE: u64 = 4096;

/// Physical memory address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(pub u64);

/// Virtual memory address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(pub u64);

impl PhysAddr {
    /// Create a new physical address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this address is null (zero).
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this address is page-aligned (4KB).
    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & (PAGE_SIZE - 1) == 0
    }

    /// Add an offset to this address.
    #[inline]
    #[must_use]
    pub const fn offset(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Translate to the virtual address the loader placed this byte at.
    ///
    /// `pv_offset` is defined by `virt + pv_offset == phys`.
    #[inline]
    #[must_use]
    pub const fn to_virt(self, pv_offset: i64) -> VirtAddr {
        VirtAddr(self.0.wrapping_sub(pv_offset as u64))
    }
}

impl VirtAddr {
    /// Create a new virtual address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this address is null (zero).
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Add an offset to this address.
    #[inline]
    #[must_use]
    pub const fn offset(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Inverse of [`PhysAddr::to_virt`].
    #[inline]
    #[must_use]
    pub const fn to_phys(self, pv_offset: i64) -> PhysAddr {
        PhysAddr(self.0.wrapping_add(pv_offset as u64))
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Half-open physical range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PhysRegion {
    pub start: PhysAddr,
    pub end: PhysAddr,
}

impl PhysRegion {
    #[inline]
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start: PhysAddr(start),
            end: PhysAddr(end),
        }
    }

    /// Region of `size` bytes starting at `start`.
    #[inline]
    #[must_use]
    pub const fn from_size(start: u64, size: u64) -> Self {
        Self::new(start, start.wrapping_add(size))
    }

    /// Size in bytes (zero for empty or inverted regions).
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// Half-open virtual range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct VirtRegion {
    pub start: VirtAddr,
    pub end: VirtAddr,
}

impl VirtRegion {
    #[inline]
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start: VirtAddr(start),
            end: VirtAddr(end),
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }
}
