//! Boot error types
//!
//! Every fallible bring-up step returns `Result<T, BootError>`. None of
//! them are recoverable: the boot sequencer turns the first error into a
//! console diagnostic and halts the core.

use core::fmt;

/// Errors that stop a core from booting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use = "boot errors must be handled"]
pub enum BootError {
    /// The hypervisor configuration check failed.
    ///
    /// Translation control for EL2 does not match what the kernel was
    /// built for.
    HypConfigInvalid,

    /// Hardware debug support was requested but the core cannot provide it.
    DebugUnsupported,

    /// The kernel was built to manage the FPU but this core has none.
    FpuMissing,

    /// The FPU is present but could not be initialised.
    FpuInitFailed,

    /// Generic kernel setup reported failure on the primary core.
    SetupFailed,

    /// A secondary core entered a kernel built without SMP support.
    SmpDisabled,

    /// The entry's core id is beyond the configured core count.
    CoreOutOfRange,

    /// The PMU overflow interrupt was requested but the platform has no
    /// PMU line.
    PmuIrqUnavailable,

    /// A hypervisor build on a platform without the virtual GIC
    /// maintenance and virtual timer lines.
    VirtIrqUnavailable,

    /// The configured core count is zero or exceeds what the kernel's
    /// per-core arenas can hold.
    TooManyCores,
}

/// Coarse classification of [`BootError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The hardware does not match the build.
    HardwareMismatch,
    /// The generic kernel setup failed.
    SetupFailure,
    /// The build configuration and the boot inputs disagree.
    Configuration,
}

impl BootError {
    /// Get a short description of the error.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HypConfigInvalid => "hypervisor configuration check failed",
            Self::DebugUnsupported => {
                "kernel built with hardware debug support, but this board doesn't reliably support it"
            }
            Self::FpuMissing => "platform claims to have FP hardware, but does not",
            Self::FpuInitFailed => "failed to initialise FP hardware",
            Self::SetupFailed => "kernel init failed on primary core",
            Self::SmpDisabled => "secondary core entered a uniprocessor kernel",
            Self::CoreOutOfRange => "core id beyond configured core count",
            Self::PmuIrqUnavailable => "PMU overflow interrupt requested but platform has none",
            Self::VirtIrqUnavailable => "hypervisor build but platform has no virtualisation interrupts",
            Self::TooManyCores => "configured core count out of range",
        }
    }

    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::HypConfigInvalid
            | Self::DebugUnsupported
            | Self::FpuMissing
            | Self::FpuInitFailed => ErrorKind::HardwareMismatch,
            Self::SetupFailed => ErrorKind::SetupFailure,
            Self::SmpDisabled
            | Self::CoreOutOfRange
            | Self::PmuIrqUnavailable
            | Self::VirtIrqUnavailable
            | Self::TooManyCores => ErrorKind::Configuration,
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by the generic kernel setup.
///
/// Carries the collaborator's reason for the log; the boot sequence only
/// ever turns it into [`BootError::SetupFailed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetupError {
    reason: &'static str,
}

impl SetupError {
    #[must_use]
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }

    #[must_use]
    pub const fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason)
    }
}

impl From<SetupError> for BootError {
    fn from(_: SetupError) -> Self {
        Self::SetupFailed
    }
}

/// Result type for boot steps.
pub type BootResult<T> = Result<T, BootError>;
