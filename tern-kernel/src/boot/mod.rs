//! Boot Sequencing
//!
//! Drives one core from its entry point to the first scheduled thread.
//!
//! # Phases
//!
//! ```text
//! primary:    Reset -> CpuInit -> PlatformInit -> GenericSetup -> open gate -> SchedulerEntry
//! secondary:  Reset -> Released (gate) -> CpuInit -> GenericSetup -> SchedulerEntry
//! ```
//!
//! The primary does everything that exists once per machine: the kernel
//! window, the interrupt distributor, outer caches, the SMMU, the shared
//! interrupt table and generic setup. Secondaries wait until that is done
//! and then only initialise their own CPU and interrupt bank.
//!
//! # Errors
//!
//! Every step returns `BootResult`. [`BootSequencer::run`] turns the first
//! error into a console diagnostic and halts the core; nothing is retried.
//! If the primary fails, the gate stays closed and the secondaries stay
//! parked.

mod kernel;


pub use kernel::Kernel;

use tern_common::{CoreEntry, CoreId};
use tern_pal::{IrqController, Platform};

use crate::config::KernelConfig;
use crate::error::{BootError, BootResult};
use crate::gate::CoreReleaseGate;
use crate::hart::HartMap;
use crate::irq::InterruptTable;
use crate::stack::KernelStacks;
use crate::timer::TimeSource;

/// Where a core is in bring-up. Used for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootPhase {
    Reset,
    CpuInit,
    PlatformInit,
    Released,
    GenericSetup,
    SchedulerEntry,
}

/// Shared state and collaborators of the boot sequence.
///
/// One instance serves every core; each core calls [`run`](Self::run)
/// with its own entry parameters and timer.
pub struct BootSequencer<'a, P, K: ?Sized, C> {
    config: KernelConfig,
    platform: &'a P,
    kernel: &'a K,
    irqs: &'a InterruptTable<C>,
    gate: &'a CoreReleaseGate,
    harts: &'a HartMap,
    stacks: &'a KernelStacks,
}

impl<'a, P, K, C> BootSequencer<'a, P, K, C>
where
    P: Platform,
    K: Kernel + ?Sized,
    C: IrqController,
{
    #[must_use]
    pub const fn new(
        config: KernelConfig,
        platform: &'a P,
        kernel: &'a K,
        irqs: &'a InterruptTable<C>,
        gate: &'a CoreReleaseGate,
        harts: &'a HartMap,
        stacks: &'a KernelStacks,
    ) -> Self {
        Self {
            config,
            platform,
            kernel,
            irqs,
            gate,
            harts,
            stacks,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Boot this core and enter the scheduler. Never returns.
    pub fn run<T: TimeSource>(&self, entry: &CoreEntry, timer: &T) -> ! {
        let core = entry.core_id;
        if let Err(err) = self.boot_core(entry, timer) {
            self.fail(core, err);
        }

        phase(core, BootPhase::SchedulerEntry);
        self.kernel.schedule(core);
        self.kernel.activate_thread(core)
    }

    /// Everything up to, but not including, the scheduler.
    pub fn boot_core<T: TimeSource>(&self, entry: &CoreEntry, timer: &T) -> BootResult<()> {
        let core = entry.core_id;
        phase(core, BootPhase::Reset);
        self.platform.apply_errata(core);

        if !core.is_primary() && !self.config.smp {
            return Err(BootError::SmpDisabled);
        }
        if core.index() >= self.config.num_cores {
            return Err(BootError::CoreOutOfRange);
        }
        if self.config.smp {
            self.harts.record(core, entry.hart_id);
        }

        if core.is_primary() {
            self.boot_primary(entry, timer)?;
        } else {
            self.boot_secondary(core, timer)?;
        }

        if T::TICKLESS {
            if let Some(now) = timer.handoff_time() {
                self.kernel.init_node_clock(core, now, 0);
            }
        }
        Ok(())
    }

    fn boot_primary<T: TimeSource>(&self, entry: &CoreEntry, timer: &T) -> BootResult<()> {
        let core = entry.core_id;
        let layout = self.irqs.layout();
        self.config.validate(layout)?;

        log::info!(
            "booting on {} ({} core{}, {} timer)",
            self.platform.name(),
            self.config.num_cores,
            if self.config.num_cores == 1 { "" } else { "s" },
            if T::TICKLESS { "deadline" } else { "periodic" },
        );
        log::debug!("{:?}", self.config);

        self.kernel.map_kernel_window();
        self.init_cpu(core, timer)?;

        phase(core, BootPhase::PlatformInit);
        self.irqs.controller().init_global();
        self.platform.init_l2_cache();
        if self.config.smmu {
            self.kernel.smmu_init();
        }
        self.irqs.init_primary(&self.config)?;

        phase(core, BootPhase::GenericSetup);
        if let Err(err) = self.kernel.setup_kernel(&entry.params) {
            log::error!("generic setup failed: {}", err);
            return Err(err.into());
        }

        if self.config.smp {
            log::info!("releasing {} secondary cores", self.config.num_cores - 1);
            self.gate.open(core);
        }
        Ok(())
    }

    fn boot_secondary<T: TimeSource>(&self, core: CoreId, timer: &T) -> BootResult<()> {
        self.gate.await_open();
        phase(core, BootPhase::Released);

        // CPU-local init is idempotent, so once is enough here
        self.init_cpu(core, timer)?;
        self.irqs.init_secondary(core, &self.config)?;

        phase(core, BootPhase::GenericSetup);
        self.kernel.setup_kernel_on_secondary_core(core);
        Ok(())
    }

    /// Per-core CPU setup, identical on every core.
    fn init_cpu<T: TimeSource>(&self, core: CoreId, timer: &T) -> BootResult<()> {
        phase(core, BootPhase::CpuInit);
        let cfg = &self.config;

        if cfg.hypervisor && !self.kernel.check_hyp_config() {
            return Err(BootError::HypConfigInvalid);
        }
        self.kernel.activate_kernel_vspace();
        if cfg.hypervisor {
            self.kernel.vcpu_boot_init();
        }
        if cfg.hardware_debug_api && !self.kernel.init_hw_breakpoints() {
            return Err(BootError::DebugUnsupported);
        }

        let tag_core = P::TAGS_STACK_WITH_CORE && cfg.smp;
        let stack_top = self
            .stacks
            .top(core, tag_core)
            .ok_or(BootError::CoreOutOfRange)?;
        self.platform.set_kernel_stack(core, stack_top);
        self.platform.install_vectors(core);

        let has_fpu = self.platform.has_hw_fpu();
        if has_fpu {
            self.platform.disable_fpu();
        }
        if cfg.fpu {
            if !has_fpu {
                return Err(BootError::FpuMissing);
            }
            if !self.kernel.init_fpu() {
                return Err(BootError::FpuInitFailed);
            }
        }

        self.irqs.controller().init_local(core);
        if cfg.benchmarks {
            self.kernel.init_cycle_counter();
        }
        self.platform.init_user_access();
        timer.init();
        Ok(())
    }

    /// Report `err` on the early console and stop this core.
    pub fn fail(&self, core: CoreId, err: BootError) -> ! {
        log::error!("{:?}: boot failed: {}", core, err);
        self.platform.early_puts("ERROR: ");
        self.platform.early_puts(err.as_str());
        self.platform.early_puts("\n");
        self.platform.halt()
    }
}

#[inline]
fn phase(core: CoreId, phase: BootPhase) {
    log::debug!("{:?}: {:?}", core, phase);
}
