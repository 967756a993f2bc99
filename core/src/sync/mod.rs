//! Concurrency primitives the core is built from.

pub mod mutex;
pub mod spinlock;

pub use mutex::Mutex;
pub use spinlock::{LockGuard, Spinlock};
