//! Kestrel kernel-userland ABI types.
//!
//! This crate holds only the wire-stable constants and value types shared
//! between the scheduling core and anything that talks to it across a
//! boundary (syscall numbers, debugger/export wire values, clone flag
//! bits). Kernel-internal implementation types (`Task`, `ResourceId`,
//! scheduler policies) live in `kestrel_core`.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod clone_flags;
pub mod error;
pub mod syscall;
pub mod task;
pub mod wait_flags;

pub use clone_flags::CloneFlags;
pub use error::KernelError;
pub use task::{TaskExitRecord, TaskStateWire};
pub use wait_flags::WaitFlags;
