//! Test doubles for the hardware and the generic kernel.
//!
//! `MockPlatform` and `MockKernel` append to one shared [`EventLog`], so
//! tests can check the order of bring-up steps across both. Steps that the
//! [`Kernel`] trait does not tie to a core are attributed to the core that
//! last called `apply_errata` on the current thread, which is always the
//! first thing a core does.

use std::cell::Cell as StdCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tern_common::{BootParams, CoreId};
use tern_pal::{Irq, IrqController, Platform, TimerControl, TimerRegisters};

use crate::boot::Kernel;
use crate::error::SetupError;
use crate::timer::Ticks;

thread_local! {
    static CURRENT_CORE: StdCell<CoreId> = const { StdCell::new(CoreId::PRIMARY) };
}

fn current_core() -> CoreId {
    CURRENT_CORE.with(StdCell::get)
}

// -- Interrupt controller

#[derive(Clone, Copy, Debug, Default)]
struct LineRecord {
    masked: bool,
    writes: usize,
    acks: usize,
}

#[derive(Default)]
struct ControllerState {
    lines: HashMap<(usize, u32), LineRecord>,
    global_inits: usize,
    local_inits: Vec<CoreId>,
}

pub struct MockIrqController {
    state: Mutex<ControllerState>,
}

impl MockIrqController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ControllerState::default()),
        }
    }

    fn record(&self, irq: Irq) -> Option<LineRecord> {
        let state = self.state.lock().unwrap();
        state.lines.get(&(irq.core.index(), irq.line)).copied()
    }

    /// Untouched lines read as masked, like a controller out of reset.
    pub fn is_masked(&self, irq: Irq) -> bool {
        self.record(irq).is_none_or(|r| r.masked)
    }

    pub fn was_touched(&self, irq: Irq) -> bool {
        self.record(irq).is_some()
    }

    pub fn writes_to(&self, irq: Irq) -> usize {
        self.record(irq).map_or(0, |r| r.writes)
    }

    pub fn acks(&self, irq: Irq) -> usize {
        self.record(irq).map_or(0, |r| r.acks)
    }

    pub fn global_inits(&self) -> usize {
        self.state.lock().unwrap().global_inits
    }

    pub fn local_inits(&self) -> Vec<CoreId> {
        self.state.lock().unwrap().local_inits.clone()
    }
}

impl IrqController for MockIrqController {
    fn init_global(&self) {
        self.state.lock().unwrap().global_inits += 1;
    }

    fn init_local(&self, core: CoreId) {
        self.state.lock().unwrap().local_inits.push(core);
    }

    fn set_masked(&self, irq: Irq, masked: bool) {
        let mut state = self.state.lock().unwrap();
        let line = state.lines.entry((irq.core.index(), irq.line)).or_default();
        line.masked = masked;
        line.writes += 1;
    }

    fn ack(&self, irq: Irq) {
        let mut state = self.state.lock().unwrap();
        state.lines.entry((irq.core.index(), irq.line)).or_default().acks += 1;
    }
}

// -- Timer registers

/// Single-core timer register file.
pub struct MockTimerRegisters {
    frequency: u64,
    counter: StdCell<u64>,
    counter_reads: StdCell<usize>,
    compare: StdCell<u64>,
    control: StdCell<TimerControl>,
    countdown: StdCell<Option<u32>>,
    raised: StdCell<bool>,
    syncs: StdCell<usize>,
}

impl MockTimerRegisters {
    #[must_use]
    pub fn new(frequency: u64) -> Self {
        Self {
            frequency,
            counter: StdCell::new(0),
            counter_reads: StdCell::new(0),
            compare: StdCell::new(0),
            control: StdCell::new(TimerControl::empty()),
            countdown: StdCell::new(None),
            raised: StdCell::new(false),
            syncs: StdCell::new(0),
        }
    }

    pub fn set_counter(&self, value: u64) {
        self.counter.set(value);
    }

    /// Make the timer condition true (ISTATUS).
    pub fn raise(&self) {
        self.raised.set(true);
    }

    pub fn counter_reads(&self) -> usize {
        self.counter_reads.get()
    }

    pub fn countdown(&self) -> Option<u32> {
        self.countdown.get()
    }

    pub fn syncs(&self) -> usize {
        self.syncs.get()
    }
}

impl TimerRegisters for MockTimerRegisters {
    fn counter(&self) -> u64 {
        self.counter_reads.set(self.counter_reads.get() + 1);
        self.counter.get()
    }

    fn compare(&self) -> u64 {
        self.compare.get()
    }

    fn set_compare(&self, value: u64) {
        self.compare.set(value);
    }

    fn control(&self) -> TimerControl {
        let mut ctl = self.control.get();
        ctl.set(TimerControl::ISTATUS, self.raised.get());
        ctl
    }

    fn set_control(&self, ctl: TimerControl) {
        // ISTATUS is read only
        self.control.set(ctl - TimerControl::ISTATUS);
    }

    fn set_countdown(&self, ticks: u32) {
        self.countdown.set(Some(ticks));
        self.raised.set(false);
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn sync(&self) {
        self.syncs.set(self.syncs.get() + 1);
    }
}

// -- Event log

/// One observable bring-up step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Errata,
    MapKernelWindow,
    CheckHypConfig,
    ActivateVspace,
    VcpuBootInit,
    HwBreakpoints,
    SetKernelStack(u64),
    InstallVectors,
    DisableFpu,
    InitFpu,
    CycleCounter,
    UserAccess,
    L2Cache,
    SmmuInit,
    SetupKernel,
    SetupSecondary,
    NodeClock { now: Ticks, consumed: Ticks },
    Schedule,
    ActivateThread,
    Console(String),
    Halt,
}

#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<(CoreId, Step)>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, core: CoreId, step: Step) {
        self.events.lock().unwrap().push((core, step));
    }

    pub fn all(&self) -> Vec<(CoreId, Step)> {
        self.events.lock().unwrap().clone()
    }

    /// Steps of one core, in order.
    pub fn of(&self, core: CoreId) -> Vec<Step> {
        self.all()
            .into_iter()
            .filter(|(c, _)| *c == core)
            .map(|(_, step)| step)
            .collect()
    }

    /// Index of the first `step` on `core`.
    pub fn position(&self, core: CoreId, step: &Step) -> Option<usize> {
        self.all().iter().position(|(c, s)| *c == core && s == step)
    }

    pub fn count(&self, step: &Step) -> usize {
        self.all().iter().filter(|(_, s)| s == step).count()
    }

    /// Everything written to the console by any core.
    pub fn console(&self) -> String {
        self.all()
            .into_iter()
            .filter_map(|(_, step)| match step {
                Step::Console(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

// -- Platform

pub struct MockPlatform {
    log: Arc<EventLog>,
    has_fpu: bool,
}

impl MockPlatform {
    #[must_use]
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            has_fpu: true,
        }
    }

    #[must_use]
    pub fn without_fpu(mut self) -> Self {
        self.has_fpu = false;
        self
    }

    fn push(&self, core: CoreId, step: Step) {
        self.log.push(core, step);
    }
}

/// Panic payload of [`MockPlatform::halt`].
#[derive(Debug, PartialEq, Eq)]
pub struct Halted(pub CoreId);

/// Panic payload of [`MockKernel::activate_thread`].
#[derive(Debug, PartialEq, Eq)]
pub struct Activated(pub CoreId);

impl Platform for MockPlatform {
    const TAGS_STACK_WITH_CORE: bool = true;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn apply_errata(&self, core: CoreId) {
        CURRENT_CORE.with(|c| c.set(core));
        self.push(core, Step::Errata);
    }

    fn install_vectors(&self, core: CoreId) {
        self.push(core, Step::InstallVectors);
    }

    fn set_kernel_stack(&self, core: CoreId, top: u64) {
        self.push(core, Step::SetKernelStack(top));
    }

    fn has_hw_fpu(&self) -> bool {
        self.has_fpu
    }

    fn disable_fpu(&self) {
        self.push(current_core(), Step::DisableFpu);
    }

    fn init_user_access(&self) {
        self.push(current_core(), Step::UserAccess);
    }

    fn init_l2_cache(&self) {
        self.push(current_core(), Step::L2Cache);
    }

    fn early_puts(&self, s: &str) {
        self.push(current_core(), Step::Console(s.to_string()));
    }

    fn halt(&self) -> ! {
        let core = current_core();
        self.push(core, Step::Halt);
        panic::panic_any(Halted(core))
    }
}

// -- Generic kernel

pub struct MockKernel {
    log: Arc<EventLog>,
    setup_error: Option<&'static str>,
    fpu_ok: bool,
    hyp_ok: bool,
    debug_ok: bool,
    node_clocks: Mutex<HashMap<usize, (Ticks, Ticks)>>,
}

impl MockKernel {
    #[must_use]
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            setup_error: None,
            fpu_ok: true,
            hyp_ok: true,
            debug_ok: true,
            node_clocks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn failing_setup(mut self, reason: &'static str) -> Self {
        self.setup_error = Some(reason);
        self
    }

    #[must_use]
    pub fn failing_fpu(mut self) -> Self {
        self.fpu_ok = false;
        self
    }

    #[must_use]
    pub fn failing_hyp_check(mut self) -> Self {
        self.hyp_ok = false;
        self
    }

    #[must_use]
    pub fn without_debug_support(mut self) -> Self {
        self.debug_ok = false;
        self
    }

    pub fn node_clock(&self, core: CoreId) -> Option<(Ticks, Ticks)> {
        self.node_clocks.lock().unwrap().get(&core.index()).copied()
    }

    fn push(&self, step: Step) {
        self.log.push(current_core(), step);
    }
}

impl Kernel for MockKernel {
    fn map_kernel_window(&self) {
        self.push(Step::MapKernelWindow);
    }

    fn activate_kernel_vspace(&self) {
        self.push(Step::ActivateVspace);
    }

    fn setup_kernel(&self, _params: &BootParams) -> Result<(), SetupError> {
        self.push(Step::SetupKernel);
        match self.setup_error {
            Some(reason) => Err(SetupError::new(reason)),
            None => Ok(()),
        }
    }

    fn setup_kernel_on_secondary_core(&self, core: CoreId) {
        self.log.push(core, Step::SetupSecondary);
    }

    fn init_fpu(&self) -> bool {
        self.push(Step::InitFpu);
        self.fpu_ok
    }

    fn vcpu_boot_init(&self) {
        self.push(Step::VcpuBootInit);
    }

    fn check_hyp_config(&self) -> bool {
        self.push(Step::CheckHypConfig);
        self.hyp_ok
    }

    fn init_hw_breakpoints(&self) -> bool {
        self.push(Step::HwBreakpoints);
        self.debug_ok
    }

    fn init_cycle_counter(&self) {
        self.push(Step::CycleCounter);
    }

    fn smmu_init(&self) {
        self.push(Step::SmmuInit);
    }

    fn init_node_clock(&self, core: CoreId, now: Ticks, consumed: Ticks) {
        self.node_clocks
            .lock()
            .unwrap()
            .insert(core.index(), (now, consumed));
        self.log.push(core, Step::NodeClock { now, consumed });
    }

    fn schedule(&self, core: CoreId) {
        self.log.push(core, Step::Schedule);
    }

    fn activate_thread(&self, core: CoreId) -> ! {
        self.log.push(core, Step::ActivateThread);
        panic::panic_any(Activated(core))
    }
}

/// How a diverging boot path ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Terminal {
    Activated(CoreId),
    Halted(CoreId),
}

/// Run a diverging function and report which terminal action it reached.
///
/// # Panics
///
/// Re-raises any panic that is not one of the mock terminal payloads.
pub fn run_to_terminal(f: impl FnOnce() -> std::convert::Infallible) -> Terminal {
    silence_terminal_panics();
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(never) => match never {},
        Err(payload) => {
            if let Some(Activated(core)) = payload.downcast_ref::<Activated>() {
                Terminal::Activated(*core)
            } else if let Some(Halted(core)) = payload.downcast_ref::<Halted>() {
                Terminal::Halted(*core)
            } else {
                panic::resume_unwind(payload)
            }
        }
    }
}

/// Keep the expected terminal panics out of test output.
fn silence_terminal_panics() {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        let default = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            if payload.is::<Activated>() || payload.is::<Halted>() {
                return;
            }
            default(info);
        }));
    });
}
