//! QEMU `virt` Machine
//!
//! Board description for the QEMU `virt` machine on both supported
//! architectures. Device addresses are the fixed ones QEMU uses; the loader
//! maps the device window 1:1, so they are used as-is.

#[cfg(target_arch = "aarch64")]
pub use self::arm::{IRQ_LAYOUT, QemuVirt, TIMER_IRQ};
#[cfg(target_arch = "riscv64")]
pub use self::riscv::{IRQ_LAYOUT, QemuVirt, TIMER_FREQUENCY, TIMER_IRQ};

#[cfg(target_arch = "aarch64")]
mod arm {
    use core::sync::atomic::{AtomicU64, Ordering};

    use tern_arch::aarch64;
    use tern_common::CoreId;

    use crate::generic_timer::VIRTUAL_TIMER_PPI;
    use crate::gic::{GicController, MAX_INTID, NUM_PRIVATE};
    use crate::irq::IrqLayout;
    use crate::platform::Platform;

    const GICD_BASE: u64 = 0x0800_0000;
    const GICC_BASE: u64 = 0x0801_0000;
    const UART_BASE: u64 = 0x0900_0000;

    pub const TIMER_IRQ: u32 = VIRTUAL_TIMER_PPI;
    const REMOTE_CALL_SGI: u32 = 0;
    const RESCHEDULE_SGI: u32 = 1;
    const PMU_PPI: u32 = 23;

    // No virtualisation lines: the kernel itself owns the virtual timer, so
    // this board runs at EL1 only
    pub const IRQ_LAYOUT: IrqLayout = IrqLayout::new(MAX_INTID, NUM_PRIVATE, TIMER_IRQ)
        .with_ipis(REMOTE_CALL_SGI, RESCHEDULE_SGI)
        .with_pmu(PMU_PPI);

    /// QEMU virt with a GICv2 and PL011.
    pub struct QemuVirt {
        vectors: AtomicU64,
        pub gic: GicController,
    }

    impl QemuVirt {
        #[must_use]
        pub const fn new() -> Self {
            Self {
                vectors: AtomicU64::new(0),
                gic: GicController::new(),
            }
        }

        /// Bind the console and interrupt controller to their MMIO windows
        /// and record the kernel's exception vector table.
        ///
        /// # Safety
        ///
        /// The device window must be mapped 1:1 and this must run once on
        /// the primary, before any other use of the console or GIC.
        /// `vectors` must be a 2KB aligned vector table mapped for the life
        /// of the kernel.
        pub unsafe fn bind_devices(&self, vectors: u64) {
            self.vectors.store(vectors, Ordering::Relaxed);
            // SAFETY: Caller guarantees the device window is mapped
            unsafe {
                crate::console::init_pl011(UART_BASE);
                self.gic.init_v2(GICD_BASE, GICC_BASE);
            }
        }
    }

    impl Default for QemuVirt {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Platform for QemuVirt {
        const TAGS_STACK_WITH_CORE: bool = true;

        fn name(&self) -> &'static str {
            "qemu-arm-virt"
        }

        fn install_vectors(&self, _core: CoreId) {
            // SAFETY: bind_devices() recorded the kernel's vector table,
            // and secondaries only run after the primary published it
            unsafe { aarch64::install_vectors(self.vectors.load(Ordering::Relaxed)) }
        }

        fn set_kernel_stack(&self, _core: CoreId, top: u64) {
            aarch64::set_kernel_stack(top);
        }

        fn has_hw_fpu(&self) -> bool {
            aarch64::fpu_present()
        }

        fn disable_fpu(&self) {
            aarch64::disable_fpu();
        }

        fn init_user_access(&self) {
            aarch64::init_user_access();
        }
    }
}

#[cfg(target_arch = "riscv64")]
mod riscv {
    use core::sync::atomic::{AtomicU64, Ordering};

    use tern_arch::riscv64;
    use tern_common::{CoreId, MAX_CORES};

    use crate::irq::IrqLayout;
    use crate::plic::{HartLocalLines, PlicController};
    use crate::platform::Platform;

    const PLIC_BASE: usize = 0x0c00_0000;
    const PLIC_MAX_SOURCE: u32 = 95;

    pub const TIMER_IRQ: u32 = PLIC_MAX_SOURCE + 1;
    const REMOTE_CALL_IPI: u32 = PLIC_MAX_SOURCE + 2;
    const RESCHEDULE_IPI: u32 = PLIC_MAX_SOURCE + 3;

    pub const IRQ_LAYOUT: IrqLayout = IrqLayout::new(RESCHEDULE_IPI, 0, TIMER_IRQ)
        .with_invalid(0)
        .with_ipis(REMOTE_CALL_IPI, RESCHEDULE_IPI);

    /// `timebase-frequency` of QEMU virt.
    pub const TIMER_FREQUENCY: u64 = 10_000_000;

    const fn supervisor_contexts() -> [usize; MAX_CORES] {
        let mut contexts = [0; MAX_CORES];
        let mut hart = 0;
        while hart < MAX_CORES {
            contexts[hart] = 2 * hart + 1;
            hart += 1;
        }
        contexts
    }

    /// QEMU virt with a PLIC and SBI console/timer.
    pub struct QemuVirt {
        vectors: AtomicU64,
        pub plic: PlicController,
    }

    impl QemuVirt {
        #[must_use]
        pub const fn new() -> Self {
            // SAFETY: QEMU virt's PLIC sits at PLIC_BASE and this board
            // value is the only driver of it
            let plic = unsafe {
                PlicController::new(
                    PLIC_BASE,
                    PLIC_MAX_SOURCE,
                    HartLocalLines {
                        timer: TIMER_IRQ,
                        remote_call_ipi: REMOTE_CALL_IPI,
                        reschedule_ipi: RESCHEDULE_IPI,
                    },
                    supervisor_contexts(),
                )
            };
            Self {
                vectors: AtomicU64::new(0),
                plic,
            }
        }

        /// Route the console to SBI and record the kernel's trap entry.
        ///
        /// # Safety
        ///
        /// Must run once on the primary before secondaries are released.
        /// `vectors` must be a trap entry mapped for the life of the kernel.
        pub unsafe fn bind_devices(&self, vectors: u64) {
            self.vectors.store(vectors, Ordering::Relaxed);
            crate::console::init_sbi();
        }
    }

    impl Default for QemuVirt {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Platform for QemuVirt {
        fn name(&self) -> &'static str {
            "qemu-riscv-virt"
        }

        fn install_vectors(&self, _core: CoreId) {
            // SAFETY: bind_devices() recorded the kernel's trap entry
            unsafe { riscv64::install_vectors(self.vectors.load(Ordering::Relaxed)) }
        }

        fn set_kernel_stack(&self, _core: CoreId, top: u64) {
            riscv64::set_kernel_stack(top);
        }

        fn has_hw_fpu(&self) -> bool {
            riscv64::fpu_present()
        }

        fn disable_fpu(&self) {
            riscv64::disable_fpu();
        }
    }
}
