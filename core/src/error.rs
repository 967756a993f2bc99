//! Error handling.
//!
//! Transient errors (`WouldBlock`, `NoSuchProcess`) and resource
//! exhaustion (`OutOfMemory`, `InvalidArgument`) are returned normally.
//! `Fatal` represents a corrupted invariant or assertion failure; it is
//! logged and the caller is expected to halt the offending CPU rather
//! than unwind through kernel code (no kernel code here ever panics on
//! a reachable path — this type exists so callers *can* report
//! corruption without reaching for `panic!`).

pub use kestrel_abi::KernelError;

pub type KResult<T> = Result<T, KernelError>;

/// Log a fatal condition. Call sites are expected to halt the CPU
/// immediately afterward; this function itself never halts so it stays
/// usable from unit tests.
pub fn report_fatal(context: &str) {
    kestrel_lib::klog_error!("FATAL: {}", context);
}
