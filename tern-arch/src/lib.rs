//! # tern-arch
//!
//! CPU primitives for the tern kernel's bring-up path.
//!
//! - [`cpu`]: halt, wait-for-interrupt, wait-for-event / send-event
//! - [`barrier`]: memory and instruction barriers, flag publication
//! - [`cache`]: data cache line maintenance
//! - [`aarch64`] / [`riscv64`]: per-core system register setup (vectors,
//!   kernel stack slot, FPU probe and trap control)
//!
//! Everything outside the per-architecture modules builds on any target;
//! hosted builds get portable fallbacks so the kernel's boot logic can be
//! unit tested.
//!
//! # Safety
//!
//! All unsafe operations are documented with `// SAFETY:` comments
//! explaining the invariants that must be maintained.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod barrier;
pub mod cache;
pub mod cpu;

#[cfg(target_arch = "aarch64")]
pub mod aarch64;
#[cfg(target_arch = "riscv64")]
pub mod riscv64;

pub use cpu::{halt, wait_for_interrupt};
