//! Boot Handoff Protocol
//!
//! Defines what the assembly trampoline passes into the kernel on every core,
//! and the arithmetic the kernel derives from it before any allocator exists.

use core::fmt;

use crate::addr::{PAGE_SIZE, PhysAddr, PhysRegion, VirtAddr, VirtRegion};

/// Maximum number of cores any build supports.
///
/// Per-core arenas (interrupt banks, kernel stacks, hart map) are sized by
/// this at compile time.
pub const MAX_CORES: usize = 8;

/// Logical core index in `[0, MAX_CORES)`.
///
/// Core 0 is always the primary. Assigned by the loader before the kernel
/// runs and never changed afterwards.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct CoreId(usize);

impl CoreId {
    /// The core that performs one-time global initialisation.
    pub const PRIMARY: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_primary(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hardware thread identifier (RISC-V hart id, ARM MPIDR affinity).
pub type HartId = usize;

/// Parameters the loader hands to every core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct BootParams {
    /// Physical start of the initial user image.
    pub ui_phys_start: PhysAddr,
    /// Physical end (exclusive) of the initial user image.
    pub ui_phys_end: PhysAddr,
    /// Offset defined by `virt + pv_offset == phys` for the user image.
    pub pv_offset: i64,
    /// Entry point of the initial user image.
    pub ui_virt_entry: VirtAddr,
    /// Physical address of the device tree blob (0 if none).
    pub dtb_phys: PhysAddr,
    /// Size of the device tree blob in bytes (0 if none).
    pub dtb_size: u64,
}

impl BootParams {
    /// Physical extent of the user image.
    #[must_use]
    pub const fn user_image_phys(&self) -> PhysRegion {
        PhysRegion {
            start: self.ui_phys_start,
            end: self.ui_phys_end,
        }
    }

    /// Virtual extent of the user image, as the loader linked it.
    #[must_use]
    pub const fn user_image_virt(&self) -> VirtRegion {
        VirtRegion {
            start: self.ui_phys_start.to_virt(self.pv_offset),
            end: self.ui_phys_end.to_virt(self.pv_offset),
        }
    }

    /// Device tree region, or `None` when the loader passed no DTB.
    #[must_use]
    pub const fn dtb_region(&self) -> Option<PhysRegion> {
        if self.dtb_phys.is_null() || self.dtb_size == 0 {
            None
        } else {
            Some(PhysRegion::from_size(self.dtb_phys.as_u64(), self.dtb_size))
        }
    }

    /// Virtual placement of the frames the kernel maps after the user image.
    #[must_use]
    pub const fn user_layout(&self) -> UserImageLayout {
        let image = self.user_image_virt();
        let ipc_buffer = image.end;
        let boot_info = ipc_buffer.offset(PAGE_SIZE);
        let extra_boot_info = boot_info.offset(PAGE_SIZE);
        UserImageLayout {
            image,
            ipc_buffer,
            boot_info,
            extra_boot_info,
        }
    }

    /// Regions the free-memory allocator must never hand out.
    ///
    /// Fills, in order: the kernel image, the DTB (only if present), the user
    /// image. `N` is the platform's reserved-region capacity.
    pub fn reserved_regions<const N: usize>(
        &self,
        kernel_image: PhysRegion,
    ) -> Result<ReservedRegions<N>, RegionError> {
        let mut regions = ReservedRegions::new();
        regions.push(kernel_image).map_err(|_| RegionError::NoSlotForKernel)?;
        if let Some(dtb) = self.dtb_region() {
            regions.push(dtb).map_err(|_| RegionError::NoSlotForDtb)?;
        }
        regions
            .push(self.user_image_phys())
            .map_err(|_| RegionError::NoSlotForUserImage)?;
        Ok(regions)
    }
}

/// Where the initial thread's image and boot frames live in its vspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserImageLayout {
    /// The image itself.
    pub image: VirtRegion,
    /// IPC buffer frame, directly after the image.
    pub ipc_buffer: VirtAddr,
    /// Boot info frame, one page after the IPC buffer.
    pub boot_info: VirtAddr,
    /// Extra boot info (DTB copy etc.), one page after boot info.
    pub extra_boot_info: VirtAddr,
}

/// Fixed-capacity list of reserved physical regions.
#[derive(Clone, Copy, Debug)]
pub struct ReservedRegions<const N: usize> {
    regions: [PhysRegion; N],
    len: usize,
}

impl<const N: usize> ReservedRegions<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: [PhysRegion::new(0, 0); N],
            len: 0,
        }
    }

    /// Append a region; returns it back when the list is full.
    pub fn push(&mut self, region: PhysRegion) -> Result<(), PhysRegion> {
        if self.len >= N {
            return Err(region);
        }
        self.regions[self.len] = region;
        self.len += 1;
        Ok(())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PhysRegion] {
        &self.regions[..self.len]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for ReservedRegions<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reserved region list overflowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionError {
    NoSlotForKernel,
    NoSlotForDtb,
    NoSlotForUserImage,
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::NoSlotForKernel => "kernel image",
            Self::NoSlotForDtb => "DTB",
            Self::NoSlotForUserImage => "user image",
        };
        write!(f, "no slot to add {} to reserved regions", what)
    }
}

/// Everything one core receives at entry.
///
/// `hart_id` and `core_id` come from the trampoline on SMP builds; a
/// uniprocessor entry uses [`CoreEntry::uniprocessor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreEntry {
    pub params: BootParams,
    pub hart_id: HartId,
    pub core_id: CoreId,
}

impl CoreEntry {
    #[must_use]
    pub const fn new(params: BootParams, hart_id: HartId, core_id: CoreId) -> Self {
        Self {
            params,
            hart_id,
            core_id,
        }
    }

    /// Entry on a build without multi-core support: always core 0.
    #[must_use]
    pub const fn uniprocessor(params: BootParams) -> Self {
        Self::new(params, 0, CoreId::PRIMARY)
    }
}
