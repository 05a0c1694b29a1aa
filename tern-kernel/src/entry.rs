//! Bare-metal entry
//!
//! `init_kernel` is what the assembly trampoline jumps to on every core,
//! with the MMU on and a boot stack set up. Everything it needs lives in
//! statics; the generic kernel supplies itself through
//! `tern_generic_kernel`, and the trampoline's object provides the
//! exception vectors as `tern_kernel_vectors`.
//!
//! The interrupt table, the release gate and each core's kernel timer
//! outlive bring-up; the generic kernel reaches them through
//! [`interrupts`], [`release_gate`] and [`kernel_timer_of`].

use core::panic::PanicInfo;

use log::LevelFilter;
use tern_common::{BootParams, CoreEntry, CoreId, HartId, PhysAddr, VirtAddr};
use tern_pal::qemu_virt::{IRQ_LAYOUT, QemuVirt};

use crate::boot::{BootSequencer, Kernel};
use crate::config::KernelConfig;
use crate::error::BootError;
use crate::gate::CoreReleaseGate;
use crate::hart::HartMap;
use crate::irq::InterruptTable;
use crate::logging;
use crate::percore::PerCore;
use crate::stack::KernelStacks;
use crate::timer::{KernelTimer, kernel_timer};

#[cfg(target_arch = "aarch64")]
pub type BoardIrqController = tern_pal::gic::GicController;
#[cfg(target_arch = "riscv64")]
pub type BoardIrqController = tern_pal::plic::PlicController;

#[cfg(target_arch = "aarch64")]
pub type BoardTimerRegisters = tern_pal::generic_timer::GenericTimer;
#[cfg(target_arch = "riscv64")]
pub type BoardTimerRegisters = tern_pal::sbi_timer::SbiTimer;

/// The kernel timer of this board and build.
pub type BoardTimer = KernelTimer<BoardTimerRegisters>;

static BOARD: QemuVirt = QemuVirt::new();

#[cfg(target_arch = "aarch64")]
static IRQS: InterruptTable<&BoardIrqController> = InterruptTable::new(&BOARD.gic, IRQ_LAYOUT);
#[cfg(target_arch = "riscv64")]
static IRQS: InterruptTable<&BoardIrqController> = InterruptTable::new(&BOARD.plic, IRQ_LAYOUT);

static GATE: CoreReleaseGate = CoreReleaseGate::new();
static HARTS: HartMap = HartMap::new();
static STACKS: KernelStacks = KernelStacks::new();
static TIMERS: PerCore<BoardTimer> = PerCore::new();

/// Classification table and interrupt controller of this board.
#[must_use]
pub fn interrupts() -> &'static InterruptTable<&'static BoardIrqController> {
    &IRQS
}

#[must_use]
pub fn release_gate() -> &'static CoreReleaseGate {
    &GATE
}

/// The kernel timer `core` booted with, or `None` before it booted.
///
/// # Safety
///
/// Must be called on `core`. Timers are core-local and not shared.
#[must_use]
pub unsafe fn kernel_timer_of(core: CoreId) -> Option<&'static BoardTimer> {
    // SAFETY: Forwarded to the caller
    unsafe { TIMERS.get(core) }
}

fn new_board_timer() -> BoardTimer {
    #[cfg(target_arch = "aarch64")]
    let regs = tern_pal::generic_timer::GenericTimer::new();
    #[cfg(target_arch = "riscv64")]
    let regs = tern_pal::sbi_timer::SbiTimer::new(tern_pal::qemu_virt::TIMER_FREQUENCY);
    kernel_timer(regs)
}

unsafe extern "Rust" {
    /// The generic kernel bring-up hands over to.
    safe fn tern_generic_kernel() -> &'static dyn Kernel;
}

unsafe extern "C" {
    /// Exception vector table (AArch64) or trap entry (RV64).
    static tern_kernel_vectors: u8;
}

#[cfg(target_arch = "aarch64")]
fn running_core() -> CoreId {
    HARTS
        .core_of(tern_arch::aarch64::hart_id())
        .unwrap_or(CoreId::PRIMARY)
}

/// Kernel entry point, on every core.
///
/// # Safety
///
/// Called once per core by the boot trampoline. The user image and DTB
/// ranges must describe memory the loader set up, the device window must
/// be mapped 1:1, and the primary (core 0) must enter before any
/// secondary can pass the release gate.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn init_kernel(
    ui_phys_start: u64,
    ui_phys_end: u64,
    pv_offset: i64,
    ui_virt_entry: u64,
    dtb_phys: u64,
    dtb_size: u64,
    hart_id: HartId,
    core_id: usize,
) -> ! {
    let config = KernelConfig::BUILD;
    let params = BootParams {
        ui_phys_start: PhysAddr::new(ui_phys_start),
        ui_phys_end: PhysAddr::new(ui_phys_end),
        pv_offset,
        ui_virt_entry: VirtAddr::new(ui_virt_entry),
        dtb_phys: PhysAddr::new(dtb_phys),
        dtb_size,
    };
    let entry = if config.smp {
        CoreEntry::new(params, hart_id, CoreId::new(core_id))
    } else {
        CoreEntry::uniprocessor(params)
    };

    if entry.core_id.is_primary() {
        // SAFETY: Caller guarantees the device window is mapped and that
        // this is the primary's only entry; the vector symbol is linked
        // into the kernel image
        unsafe { BOARD.bind_devices(&raw const tern_kernel_vectors as u64) };
        logging::init(LevelFilter::Info);
        #[cfg(target_arch = "aarch64")]
        if config.smp {
            logging::set_core_reader(running_core);
        }
    }

    let sequencer = BootSequencer::new(
        config,
        &BOARD,
        tern_generic_kernel(),
        &IRQS,
        &GATE,
        &HARTS,
        &STACKS,
    );

    let core = entry.core_id;
    // SAFETY: This is `core`'s own entry, and its timer never leaves it
    let Some(timer) = (unsafe { TIMERS.get_or_init(core, new_board_timer) }) else {
        sequencer.fail(core, BootError::CoreOutOfRange)
    };

    sequencer.run(&entry, timer)
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tern_pal::println!("KERNEL PANIC: {}", info);
    tern_arch::halt()
}
