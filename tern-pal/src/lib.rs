//! Platform Abstraction Layer
//!
//! Hardware the tern kernel touches during bring-up, behind trait
//! interfaces so the boot sequence itself is board independent:
//! - [`platform`]: per-board CPU and cache hooks
//! - [`irq`]: interrupt controller interface and numbering
//! - [`timer`]: timer register access
//! - [`console`]: early diagnostic output
//!
//! Backends: GIC and the ARM generic timer on AArch64; PLIC and the SBI
//! timer on RV64. [`qemu_virt`] ties them together for QEMU's `virt`
//! machine.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod console;
pub mod irq;
pub mod platform;
pub mod timer;

#[cfg(target_arch = "aarch64")]
pub mod generic_timer;
#[cfg(target_arch = "aarch64")]
pub mod gic;

pub mod plic;
#[cfg(target_arch = "riscv64")]
pub mod sbi_timer;

#[cfg(any(target_arch = "aarch64", target_arch = "riscv64"))]
pub mod qemu_virt;

pub use irq::{Irq, IrqController, IrqLayout};
pub use platform::Platform;
pub use timer::{TimerControl, TimerRegisters};
