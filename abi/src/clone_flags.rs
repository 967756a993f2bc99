//! `clone(2)`-style flags recognized by `TaskManager::clone_task`.
//!
//! Bit values match Linux's `CLONE_*` numbering so that a userland port
//! can reuse the same ABI constants.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CloneFlags: u32 {
        const VM       = 0x100;
        const FS       = 0x200;
        const FILES    = 0x400;
        const SIGHAND  = 0x800;
        const PARENT   = 0x8000;
        const THREAD   = 0x10000;
    }
}

impl CloneFlags {
    /// POSIX requires `VM`, `FILES`, and `SIGHAND` whenever `THREAD` is
    /// set; silently complete a flag set that forgot them.
    #[inline]
    pub const fn normalized(self) -> Self {
        if self.contains(Self::THREAD) {
            self.union(Self::VM).union(Self::FILES).union(Self::SIGHAND)
        } else {
            self
        }
    }
}
