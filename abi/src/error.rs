//! Error categories returned by core operations.

/// Coarse error category. `Fatal` is never propagated across a public
/// API boundary — callers that detect a fatal condition log and halt
/// instead (see `kestrel_core::error`).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    InvalidArgument = 0,
    OutOfMemory = 1,
    NoSuchProcess = 2,
    WouldBlock = 3,
    PermissionDenied = 4,
    Fatal = 5,
}
