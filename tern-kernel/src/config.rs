//! Build Configuration
//!
//! The Cargo features of this crate, gathered into one `Copy` value.
//! [`KernelConfig::BUILD`] is a `const`, so every branch on it folds away;
//! tests build other configurations with the `const fn` builders.

use tern_common::MAX_CORES;
use tern_pal::IrqLayout;

use crate::error::{BootError, BootResult};

/// Number of cores an SMP build brings up.
pub const CONFIG_MAX_CORES: usize = 4;

const _: () = assert!(CONFIG_MAX_CORES <= MAX_CORES);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    /// Cores this build brings up (1 unless `smp`).
    pub num_cores: usize,
    pub smp: bool,
    /// Deadline (tickless) scheduling.
    pub mcs: bool,
    pub fpu: bool,
    pub hypervisor: bool,
    pub hardware_debug_api: bool,
    pub pmu_overflow_irq: bool,
    pub smmu: bool,
    pub benchmarks: bool,
}

impl KernelConfig {
    /// The configuration this crate was compiled with.
    pub const BUILD: Self = Self {
        num_cores: if cfg!(feature = "smp") { CONFIG_MAX_CORES } else { 1 },
        smp: cfg!(feature = "smp"),
        mcs: cfg!(feature = "mcs"),
        fpu: cfg!(feature = "fpu"),
        hypervisor: cfg!(feature = "hypervisor"),
        hardware_debug_api: cfg!(feature = "hardware-debug-api"),
        pmu_overflow_irq: cfg!(feature = "pmu-overflow-irq"),
        smmu: cfg!(feature = "smmu"),
        benchmarks: cfg!(feature = "benchmarks"),
    };

    /// Single core, every option off.
    #[must_use]
    pub const fn uniprocessor() -> Self {
        Self {
            num_cores: 1,
            smp: false,
            mcs: false,
            fpu: false,
            hypervisor: false,
            hardware_debug_api: false,
            pmu_overflow_irq: false,
            smmu: false,
            benchmarks: false,
        }
    }

    #[must_use]
    pub const fn with_smp(mut self, num_cores: usize) -> Self {
        self.smp = true;
        self.num_cores = num_cores;
        self
    }

    #[must_use]
    pub const fn with_mcs(mut self) -> Self {
        self.mcs = true;
        self
    }

    #[must_use]
    pub const fn with_fpu(mut self) -> Self {
        self.fpu = true;
        self
    }

    #[must_use]
    pub const fn with_hypervisor(mut self) -> Self {
        self.hypervisor = true;
        self
    }

    #[must_use]
    pub const fn with_hardware_debug_api(mut self) -> Self {
        self.hardware_debug_api = true;
        self
    }

    #[must_use]
    pub const fn with_pmu_overflow_irq(mut self) -> Self {
        self.pmu_overflow_irq = true;
        self
    }

    #[must_use]
    pub const fn with_smmu(mut self) -> Self {
        self.smmu = true;
        self
    }

    #[must_use]
    pub const fn with_benchmarks(mut self) -> Self {
        self.benchmarks = true;
        self
    }

    /// Check the configuration against the platform before anything is
    /// programmed.
    ///
    /// An SMMU without a fault line is allowed; the line is then simply
    /// not claimed.
    pub fn validate(&self, layout: &IrqLayout) -> BootResult<()> {
        if self.num_cores == 0 || self.num_cores > MAX_CORES {
            return Err(BootError::TooManyCores);
        }
        if !self.smp && self.num_cores != 1 {
            return Err(BootError::TooManyCores);
        }
        if self.pmu_overflow_irq && layout.pmu.is_none() {
            return Err(BootError::PmuIrqUnavailable);
        }
        if self.hypervisor && (layout.vgic_maintenance.is_none() || layout.vtimer_event.is_none()) {
            return Err(BootError::VirtIrqUnavailable);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::BUILD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> IrqLayout {
        IrqLayout::new(95, 32, 27).with_ipis(0, 1)
    }

    #[test]
    fn test_uniprocessor_is_valid() {
        assert_eq!(KernelConfig::uniprocessor().validate(&layout()), Ok(()));
    }

    #[test]
    fn test_core_count_bounds() {
        let cfg = KernelConfig::uniprocessor().with_smp(MAX_CORES + 1);
        assert_eq!(cfg.validate(&layout()), Err(BootError::TooManyCores));
        let cfg = KernelConfig::uniprocessor().with_smp(0);
        assert_eq!(cfg.validate(&layout()), Err(BootError::TooManyCores));
        let cfg = KernelConfig::uniprocessor().with_smp(MAX_CORES);
        assert_eq!(cfg.validate(&layout()), Ok(()));
    }

    #[test]
    fn test_pmu_requires_line() {
        let cfg = KernelConfig::uniprocessor().with_pmu_overflow_irq();
        assert_eq!(cfg.validate(&layout()), Err(BootError::PmuIrqUnavailable));
        assert_eq!(cfg.validate(&layout().with_pmu(23)), Ok(()));
    }

    #[test]
    fn test_hypervisor_requires_virtualisation_lines() {
        let cfg = KernelConfig::uniprocessor().with_hypervisor();
        assert_eq!(cfg.validate(&layout()), Err(BootError::VirtIrqUnavailable));
        assert_eq!(cfg.validate(&layout().with_virtualisation(25, 26)), Ok(()));

        let mut half = layout();
        half.vtimer_event = Some(26);
        assert_eq!(cfg.validate(&half), Err(BootError::VirtIrqUnavailable));
    }

    #[test]
    fn test_smmu_without_line_is_allowed() {
        let cfg = KernelConfig::uniprocessor().with_smmu();
        assert_eq!(cfg.validate(&layout()), Ok(()));
    }

    #[test]
    fn test_build_matches_features() {
        assert_eq!(KernelConfig::BUILD.smp, cfg!(feature = "smp"));
        assert_eq!(KernelConfig::BUILD.mcs, cfg!(feature = "mcs"));
        assert_eq!(KernelConfig::BUILD.validate(&layout().with_pmu(23).with_virtualisation(25, 26)), Ok(()));
    }
}
