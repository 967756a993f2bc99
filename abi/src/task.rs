//! Task ABI types: wire-stable state values and small exit records.
//!
//! These mirror `TaskState` in `kestrel_core::task::fsm` one-for-one; the
//! numeric values are load-bearing for any external debugger or trace
//! exporter and must not be renumbered.

pub const INVALID_TASK_ID: u64 = u64::MAX;
pub const INVALID_PROCESS_ID: u64 = u64::MAX;

pub const TASK_NAME_MAX_LEN: usize = 32;

/// Default kernel stack size for a new task (16 KiB, 16-byte aligned).
pub const TASK_KERNEL_STACK_SIZE: usize = 16 * 1024;
pub const TASK_KERNEL_STACK_ALIGN: usize = 16;

/// Wire representation of `TaskState`, exposed for tracing/debugger export.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStateWire {
    UnInit = 0,
    Ready = 1,
    Running = 2,
    Sleeping = 3,
    Blocked = 4,
    Exited = 5,
    Zombie = 6,
}

impl TaskStateWire {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::UnInit,
            1 => Self::Ready,
            2 => Self::Running,
            3 => Self::Sleeping,
            4 => Self::Blocked,
            5 => Self::Exited,
            6 => Self::Zombie,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Exit record handed back to a waiting parent after `Wait()` reaps a
/// zombie child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskExitRecord {
    pub pid: u64,
    pub exit_code: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        for raw in 0u8..=6 {
            let state = TaskStateWire::from_u8(raw).unwrap();
            assert_eq!(state.as_u8(), raw);
        }
        assert!(TaskStateWire::from_u8(7).is_none());
    }
}
