//! Interrupt Controller Interface
//!
//! The kernel sees every interrupt controller through [`IrqController`]
//! and every platform's interrupt numbering through [`IrqLayout`].
//!
//! # Numbering
//!
//! Lines `0..num_private` are banked: each core has its own instance of the
//! line, so an [`Irq`] names both the line and the owning core. Lines
//! `num_private..=max_irq` are shared and owned by the primary core.
//!
//! On GIC platforms SGIs and PPIs (0..32) are private. On PLIC platforms
//! there are no banked external sources, but the timer and IPI lines are
//! hart-local and numbered above the PLIC sources.

use core::fmt;

use tern_common::CoreId;

/// One interrupt source: a line, and for banked lines the core owning it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Irq {
    pub core: CoreId,
    pub line: u32,
}

impl Irq {
    #[inline]
    #[must_use]
    pub const fn new(core: CoreId, line: u32) -> Self {
        Self { core, line }
    }

    /// A shared line; shared lines are owned by the primary core.
    #[inline]
    #[must_use]
    pub const fn shared(line: u32) -> Self {
        Self::new(CoreId::PRIMARY, line)
    }
}

impl fmt::Debug for Irq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irq{}@{:?}", self.line, self.core)
    }
}

/// Interrupt numbering and the kernel-owned lines of one platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrqLayout {
    /// Highest valid line number (inclusive).
    pub max_irq: u32,
    /// Lines below this are banked per core.
    pub num_private: u32,
    /// Reserved "no interrupt" id that must never be assigned a state.
    pub invalid: Option<u32>,
    /// Per-core kernel timer.
    pub timer: u32,
    /// Remote call IPI (SMP only).
    pub remote_call_ipi: Option<u32>,
    /// Reschedule IPI (SMP only).
    pub reschedule_ipi: Option<u32>,
    /// Virtual GIC maintenance interrupt (hypervisor only).
    pub vgic_maintenance: Option<u32>,
    /// Virtual timer event (hypervisor only).
    pub vtimer_event: Option<u32>,
    /// PMU overflow interrupt.
    pub pmu: Option<u32>,
    /// SMMU fault interrupt.
    pub smmu: Option<u32>,
}

impl IrqLayout {
    /// A layout with only a timer line; the rest are added with the
    /// `with_*` builders.
    #[must_use]
    pub const fn new(max_irq: u32, num_private: u32, timer: u32) -> Self {
        Self {
            max_irq,
            num_private,
            invalid: None,
            timer,
            remote_call_ipi: None,
            reschedule_ipi: None,
            vgic_maintenance: None,
            vtimer_event: None,
            pmu: None,
            smmu: None,
        }
    }

    #[must_use]
    pub const fn with_invalid(mut self, line: u32) -> Self {
        self.invalid = Some(line);
        self
    }

    #[must_use]
    pub const fn with_ipis(mut self, remote_call: u32, reschedule: u32) -> Self {
        self.remote_call_ipi = Some(remote_call);
        self.reschedule_ipi = Some(reschedule);
        self
    }

    #[must_use]
    pub const fn with_virtualisation(mut self, vgic_maintenance: u32, vtimer_event: u32) -> Self {
        self.vgic_maintenance = Some(vgic_maintenance);
        self.vtimer_event = Some(vtimer_event);
        self
    }

    #[must_use]
    pub const fn with_pmu(mut self, line: u32) -> Self {
        self.pmu = Some(line);
        self
    }

    #[must_use]
    pub const fn with_smmu(mut self, line: u32) -> Self {
        self.smmu = Some(line);
        self
    }

    /// Whether `line` is banked per core.
    #[inline]
    #[must_use]
    pub const fn is_private(&self, line: u32) -> bool {
        line < self.num_private
    }

    /// Whether `line` is in range and not the invalid id.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self, line: u32) -> bool {
        if line > self.max_irq {
            return false;
        }
        match self.invalid {
            Some(invalid) => line != invalid,
            None => true,
        }
    }

    /// The [`Irq`] for `line` as seen from `core`.
    ///
    /// Private lines resolve to that core's bank; shared lines resolve to
    /// the primary.
    #[inline]
    #[must_use]
    pub const fn irq_for(&self, core: CoreId, line: u32) -> Irq {
        if self.is_private(line) {
            Irq::new(core, line)
        } else {
            Irq::shared(line)
        }
    }
}

/// Hardware interrupt controller.
///
/// Implementations serialise register access internally; every method
/// takes `&self` so a controller can live in a `static`.
pub trait IrqController: Sync {
    /// Distributor-level setup. Primary core, once.
    fn init_global(&self);

    /// CPU interface / redistributor setup for `core`. Runs on that core.
    fn init_local(&self, core: CoreId);

    /// Mask or unmask one source.
    fn set_masked(&self, irq: Irq, masked: bool);

    /// Signal end of interrupt for `irq`.
    fn ack(&self, irq: Irq);
}

/// Lets a controller embedded in a board `static` be shared by reference.
impl<C: IrqController + ?Sized> IrqController for &C {
    fn init_global(&self) {
        (**self).init_global();
    }

    fn init_local(&self, core: CoreId) {
        (**self).init_local(core);
    }

    fn set_masked(&self, irq: Irq, masked: bool) {
        (**self).set_masked(irq, masked);
    }

    fn ack(&self, irq: Irq) {
        (**self).ack(irq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_and_shared_resolution() {
        let layout = IrqLayout::new(95, 32, 27);
        assert_eq!(layout.irq_for(CoreId::new(2), 27), Irq::new(CoreId::new(2), 27));
        assert_eq!(layout.irq_for(CoreId::new(2), 40), Irq::shared(40));
    }

    #[test]
    fn test_invalid_line() {
        // PLIC sources 1..=53, then hart-local timer and IPIs
        let layout = IrqLayout::new(56, 0, 54).with_invalid(0).with_ipis(55, 56);
        assert!(!layout.is_valid(0));
        assert!(layout.is_valid(1));
        assert!(layout.is_valid(layout.timer));
        assert!(!layout.is_valid(57));
    }
}
