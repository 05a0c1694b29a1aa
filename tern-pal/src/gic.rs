//! GIC (Generic Interrupt Controller) Backend
//!
//! [`IrqController`] over GICv2 and GICv3 using `arm-gic`. The version is
//! chosen by the board when it calls [`GicController::init_v2`] or
//! [`GicController::init_v3`].
//!
//! SGIs and PPIs (INTID 0..32) are banked. On GICv3 they are reached
//! through the owning core's redistributor, so any core may program them.
//! On GICv2 the banked enable bits are only visible to their own core;
//! the boot path only ever touches a core's bank from that core.

use core::ptr::NonNull;

use arm_gic::gicv2::GicV2;
use arm_gic::gicv3::{GicCpuInterface, GicV3, InterruptGroup};
use arm_gic::{IntId, UniqueMmioPointer};
use spin::Mutex;
use tern_common::CoreId;

use crate::irq::{Irq, IrqController};

/// Number of banked INTIDs (16 SGIs + 16 PPIs).
pub const NUM_PRIVATE: u32 = 32;

/// INTIDs 1020..=1023 are special and never programmed.
pub const MAX_INTID: u32 = 1019;

enum GicDriver {
    V2(GicV2<'static>),
    V3(GicV3<'static>),
    Uninitialised,
}

// SAFETY: GicV2 and GicV3 contain raw MMIO pointers. All access goes
// through the Mutex in GicController.
unsafe impl Send for GicDriver {}

/// GIC-backed interrupt controller.
pub struct GicController {
    driver: Mutex<GicDriver>,
}

impl GicController {
    /// An unconfigured controller, for use in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            driver: Mutex::new(GicDriver::Uninitialised),
        }
    }

    /// Bind to a GICv2 at the given mapped addresses.
    ///
    /// # Safety
    ///
    /// `gicd` and `gicc` must be mapped device memory for the distributor
    /// and CPU interface, not aliased by any other driver.
    pub unsafe fn init_v2(&self, gicd: u64, gicc: u64) {
        use arm_gic::gicv2::registers::{Gicc, Gicd};

        // SAFETY: Caller guarantees valid, exclusive mappings
        let gic = unsafe { GicV2::new(gicd as *mut Gicd, gicc as *mut Gicc) };
        *self.driver.lock() = GicDriver::V2(gic);
    }

    /// Bind to a GICv3 at the given mapped addresses.
    ///
    /// Returns `false` if either address is null.
    ///
    /// # Safety
    ///
    /// `gicd` and `gicr` must be mapped device memory for the distributor
    /// and the redistributor frames of `cpu_count` cores.
    pub unsafe fn init_v3(&self, gicd: u64, gicr: u64, cpu_count: usize) -> bool {
        use arm_gic::gicv3::registers::{Gicd, GicrSgi};

        let (Some(gicd_ptr), Some(gicr_ptr)) = (
            NonNull::new(gicd as *mut Gicd),
            NonNull::new(gicr as *mut GicrSgi),
        ) else {
            return false;
        };

        // SAFETY: Caller guarantees valid, exclusive mappings
        let gicd = unsafe { UniqueMmioPointer::new(gicd_ptr) };
        // SAFETY: As above; no GICv4 virtual LPIs are used
        let gic = unsafe { GicV3::new(gicd, gicr_ptr, cpu_count, false) };
        *self.driver.lock() = GicDriver::V3(gic);
        true
    }
}

impl Default for GicController {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqController for GicController {
    fn init_global(&self) {
        let mut gic = self.driver.lock();
        match &mut *gic {
            GicDriver::V2(driver) => {
                driver.setup();
                driver.set_priority_mask(0xFF);
            }
            GicDriver::V3(driver) => {
                driver.setup(0);
                GicCpuInterface::set_priority_mask(0xFF);
                GicCpuInterface::enable_group1(true);
            }
            GicDriver::Uninitialised => {
                log::warn!("gic: init_global before the board bound a GIC");
            }
        }
    }

    fn init_local(&self, core: CoreId) {
        let mut gic = self.driver.lock();
        match &mut *gic {
            GicDriver::V3(driver) => {
                if !core.is_primary() {
                    driver.setup(core.index());
                }
                GicCpuInterface::set_priority_mask(0xFF);
                GicCpuInterface::enable_group1(true);
            }
            GicDriver::V2(driver) => {
                // CPU interface registers are banked; the distributor was
                // configured by the primary
                driver.set_priority_mask(0xFF);
            }
            GicDriver::Uninitialised => {
                log::warn!("gic: init_local on {:?} before the board bound a GIC", core);
            }
        }
    }

    fn set_masked(&self, irq: Irq, masked: bool) {
        let mut gic = self.driver.lock();
        let int_id = intid_from_raw(irq.line);

        match &mut *gic {
            GicDriver::V2(driver) => {
                let _ = driver.enable_interrupt(int_id, !masked);
            }
            GicDriver::V3(driver) => {
                let cpu = (irq.line < NUM_PRIVATE).then_some(irq.core.index());
                let _ = driver.enable_interrupt(int_id, cpu, !masked);
            }
            GicDriver::Uninitialised => {}
        }
    }

    fn ack(&self, irq: Irq) {
        let mut gic = self.driver.lock();
        let int_id = intid_from_raw(irq.line);

        match &mut *gic {
            GicDriver::V2(driver) => driver.end_interrupt(int_id),
            GicDriver::V3(_) => GicCpuInterface::end_interrupt(int_id, InterruptGroup::Group1),
            GicDriver::Uninitialised => {}
        }
    }
}

/// Convert a raw line number to an `IntId`.
///
/// - 0-15: SGI
/// - 16-31: PPI
/// - 32+: SPI
fn intid_from_raw(intid: u32) -> IntId {
    if intid < 16 {
        IntId::sgi(intid)
    } else if intid < NUM_PRIVATE {
        IntId::ppi(intid - 16)
    } else {
        IntId::spi(intid - NUM_PRIVATE)
    }
}
