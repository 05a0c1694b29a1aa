//! tern kernel bring-up
//!
//! Takes every core from the loader's hand-off to the first user thread:
//! boot sequencing and the secondary release gate, interrupt ownership, and
//! the kernel timer. Page tables, capabilities and scheduling live in the
//! generic kernel behind the [`Kernel`] trait.
//!
//! Hardware access goes through `tern-pal`, so everything except the
//! bare-metal [`entry`] also builds and is tested on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod boot;
pub mod config;
pub mod error;
pub mod gate;
pub mod hart;
pub mod irq;
pub mod logging;
pub mod percore;
pub mod stack;
pub mod timer;

#[cfg(target_os = "none")]
pub mod entry;

#[cfg(test)]
mod testing;

pub use boot::{BootPhase, BootSequencer, Kernel};
pub use config::KernelConfig;
pub use error::{BootError, BootResult, ErrorKind, SetupError};
pub use gate::CoreReleaseGate;
pub use irq::{InterruptTable, IrqState};
pub use percore::PerCore;
pub use timer::{KernelTimer, Ticks, TimeSource, kernel_timer};
