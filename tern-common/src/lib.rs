//! # tern-common
//!
//! Shared types for the tern loader hand-off and the kernel boot layer:
//! - [`CoreId`](boot::CoreId): logical core identity, core 0 is primary
//! - [`BootParams`](boot::BootParams): what the trampoline passes to each core
//! - [`PhysAddr`] / [`VirtAddr`]: address newtypes with wrapping arithmetic
//!
//! # no_std
//!
//! This crate is `#![no_std]` and has zero dependencies, so every other tern
//! crate can depend on it.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod addr;
pub mod boot;

pub use addr::{PhysAddr, PhysRegion, VirtAddr, VirtRegion};
pub use boot::{BootParams, CoreEntry, CoreId, HartId, MAX_CORES};
