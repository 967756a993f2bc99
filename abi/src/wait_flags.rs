//! `wait4(2)`-style flags recognized by `TaskManager::wait`.
//!
//! Bit values match Linux's `WNOHANG`/`WUNTRACED` numbering so that a
//! userland port can reuse the same ABI constants.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WaitFlags: u32 {
        const NOHANG   = 0x1;
        const UNTRACED = 0x2;
    }
}
