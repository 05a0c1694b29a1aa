//! Interrupt Source Classification
//!
//! Every interrupt source the platform exposes gets exactly one
//! [`IrqState`]. At boot everything is `Inactive` (and masked); the kernel
//! then claims the handful of lines it owns itself: the timer, IPIs on SMP
//! builds, and reserved lines for virtualisation, the PMU and the SMMU.
//! Whatever stays `Inactive` is later handed to user-level drivers.
//!
//! # Banking
//!
//! Private lines (see [`IrqLayout::is_private`]) have one slot per core.
//! Each core classifies its own bank; the primary additionally owns every
//! shared line. A secondary never touches shared state.
//!
//! # Concurrency
//!
//! Slots are atomics written with relaxed ordering. The primary finishes
//! all of its writes before opening the release gate, and each secondary
//! only writes its own bank, so the gate provides all required ordering.

use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use tern_common::{CoreId, MAX_CORES};
use tern_pal::{Irq, IrqController, IrqLayout};

use crate::config::KernelConfig;
use crate::error::{BootError, BootResult};

/// Upper bound on `IrqLayout::max_irq + 1`.
pub const MAX_IRQS: usize = 1024;

/// Upper bound on `IrqLayout::num_private`.
pub const MAX_PRIVATE: usize = 32;

/// Who an interrupt source belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IrqState {
    /// Unclaimed and masked.
    Inactive = 0,
    /// The kernel timer.
    Timer = 1,
    /// Kernel inter-processor interrupt.
    InterProcessorInterrupt = 2,
    /// Owned by the kernel for a purpose other than timer or IPI.
    Reserved = 3,
}

impl IrqState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Timer,
            2 => Self::InterProcessorInterrupt,
            3 => Self::Reserved,
            _ => Self::Inactive,
        }
    }
}

impl fmt::Display for IrqState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Timer => "timer",
            Self::InterProcessorInterrupt => "ipi",
            Self::Reserved => "reserved",
        };
        f.write_str(name)
    }
}

/// Which kernel-owned lines a core claims.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Claim {
    /// Private and shared: the primary.
    All,
    /// Only lines in the caller's private bank: secondaries.
    PrivateOnly,
}

/// Classification table for all interrupt sources, plus the controller
/// that enforces it.
pub struct InterruptTable<C> {
    controller: C,
    layout: IrqLayout,
    private: [[AtomicU8; MAX_PRIVATE]; MAX_CORES],
    shared: [AtomicU8; MAX_IRQS],
    /// Cores with a private bank in use, set by `init_primary`.
    cores: AtomicUsize,
}

impl<C: IrqController> InterruptTable<C> {
    /// Every source starts `Inactive`.
    ///
    /// # Panics
    ///
    /// If `layout` does not fit the table's fixed arenas. Evaluated at
    /// compile time when the table is a `static`.
    #[must_use]
    pub const fn new(controller: C, layout: IrqLayout) -> Self {
        assert!((layout.max_irq as usize) < MAX_IRQS, "max_irq exceeds MAX_IRQS");
        assert!((layout.num_private as usize) <= MAX_PRIVATE, "num_private exceeds MAX_PRIVATE");
        Self {
            controller,
            layout,
            private: [const { [const { AtomicU8::new(0) }; MAX_PRIVATE] }; MAX_CORES],
            shared: [const { AtomicU8::new(0) }; MAX_IRQS],
            cores: AtomicUsize::new(1),
        }
    }

    #[inline]
    #[must_use]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &IrqLayout {
        &self.layout
    }

    /// The slot for `irq`, or `None` for the invalid id and out-of-range
    /// lines. Shared lines ignore `irq.core`.
    fn slot(&self, irq: Irq) -> Option<&AtomicU8> {
        if !self.layout.is_valid(irq.line) {
            return None;
        }
        let line = irq.line as usize;
        if self.layout.is_private(irq.line) {
            self.private.get(irq.core.index())?.get(line)
        } else {
            self.shared.get(line)
        }
    }

    /// Assign `kind` to `irq` and program the mask to match: `Inactive`
    /// sources are masked, everything else is unmasked.
    ///
    /// Resetting to `Inactive` is always allowed. A source may be given a
    /// non-`Inactive` state only once (repeating the same state is a no-op).
    pub fn classify(&self, irq: Irq, kind: IrqState) {
        let Some(slot) = self.slot(irq) else {
            debug_assert!(false, "classifying invalid source {:?}", irq);
            return;
        };

        let prev = IrqState::from_raw(slot.swap(kind as u8, Ordering::Relaxed));
        debug_assert!(
            kind == IrqState::Inactive || prev == IrqState::Inactive || prev == kind,
            "{:?} reclassified from {} to {}",
            irq,
            prev,
            kind
        );

        self.controller
            .set_masked(self.normalise(irq), kind == IrqState::Inactive);
    }

    /// Mask `irq` at the controller. The classification is unchanged.
    pub fn mask(&self, irq: Irq) {
        self.controller.set_masked(self.normalise(irq), true);
    }

    /// Unmask `irq` at the controller. The classification is unchanged.
    pub fn unmask(&self, irq: Irq) {
        self.controller.set_masked(self.normalise(irq), false);
    }

    /// End-of-interrupt for `irq`.
    pub fn acknowledge(&self, irq: Irq) {
        self.controller.ack(self.normalise(irq));
    }

    /// Current classification, or `None` if `irq` is not a valid source.
    #[must_use]
    pub fn state(&self, irq: Irq) -> Option<IrqState> {
        self.slot(irq)
            .map(|slot| IrqState::from_raw(slot.load(Ordering::Relaxed)))
    }

    /// Number of valid sources in state `kind`, across the shared range
    /// and the private banks of the configured cores.
    #[must_use]
    pub fn count(&self, kind: IrqState) -> usize {
        let cores = self.cores.load(Ordering::Relaxed);
        let mut count = 0;
        for line in 0..=self.layout.max_irq {
            if !self.layout.is_valid(line) {
                continue;
            }
            if self.layout.is_private(line) {
                count += (0..cores)
                    .filter(|&core| self.state(Irq::new(CoreId::new(core), line)) == Some(kind))
                    .count();
            } else if self.state(Irq::shared(line)) == Some(kind) {
                count += 1;
            }
        }
        count
    }

    /// Classification on the primary core: every valid source in the
    /// primary's bank and the whole shared range becomes `Inactive`, then
    /// the kernel-owned lines are claimed.
    pub fn init_primary(&self, config: &KernelConfig) -> BootResult<()> {
        let core = CoreId::PRIMARY;
        self.cores
            .store(config.num_cores.clamp(1, MAX_CORES), Ordering::Relaxed);
        for line in 0..=self.layout.max_irq {
            if self.layout.is_valid(line) {
                self.classify(self.layout.irq_for(core, line), IrqState::Inactive);
            }
        }
        self.claim_kernel_lines(core, config, Claim::All)
    }

    /// Classification on a secondary core: reset its own bank, then claim
    /// the private kernel-owned lines. Shared lines were handled by the
    /// primary.
    pub fn init_secondary(&self, core: CoreId, config: &KernelConfig) -> BootResult<()> {
        for line in 0..self.layout.num_private {
            if self.layout.is_valid(line) {
                self.classify(Irq::new(core, line), IrqState::Inactive);
            }
        }
        self.claim_kernel_lines(core, config, Claim::PrivateOnly)
    }

    fn claim_kernel_lines(&self, core: CoreId, config: &KernelConfig, scope: Claim) -> BootResult<()> {
        let layout = self.layout;
        let claim = |line: u32, kind: IrqState| {
            if scope == Claim::PrivateOnly && !layout.is_private(line) {
                return;
            }
            log::trace!("irq {} on {:?} -> {}", line, core, kind);
            self.classify(layout.irq_for(core, line), kind);
        };

        claim(layout.timer, IrqState::Timer);

        if config.smp {
            for ipi in [layout.remote_call_ipi, layout.reschedule_ipi].into_iter().flatten() {
                claim(ipi, IrqState::InterProcessorInterrupt);
            }
        }

        if config.hypervisor {
            let vgic = layout.vgic_maintenance.ok_or(BootError::VirtIrqUnavailable)?;
            let vtimer = layout.vtimer_event.ok_or(BootError::VirtIrqUnavailable)?;
            claim(vgic, IrqState::Reserved);
            claim(vtimer, IrqState::Reserved);
        }

        // PMU overflow is routed to the primary only
        if config.pmu_overflow_irq && core.is_primary() {
            let pmu = layout.pmu.ok_or(BootError::PmuIrqUnavailable)?;
            claim(pmu, IrqState::Reserved);
        }

        if config.smmu {
            if let Some(line) = layout.smmu {
                claim(line, IrqState::Reserved);
            }
        }

        Ok(())
    }

    /// Shared lines are always addressed through the primary.
    fn normalise(&self, irq: Irq) -> Irq {
        self.layout.irq_for(irq.core, irq.line)
    }
}
