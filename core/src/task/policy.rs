//! The three values a task's `policy` field can take, selecting which
//! per-CPU scheduler instance owns it.

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPolicy {
    RealTime = 0,
    Normal = 1,
    Idle = 2,
}

impl TaskPolicy {
    pub const ALL_IN_PRIORITY_ORDER: [TaskPolicy; 3] =
        [TaskPolicy::RealTime, TaskPolicy::Normal, TaskPolicy::Idle];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Policy-specific scheduling data. An enum is the natural Rust shape
/// for "exactly one of these depending on which policy owns the task".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicySchedData {
    /// CFS virtual runtime state. `vruntime: 0` and `weight: 0` both
    /// mean "unset"; `CfsScheduler::enqueue` normalizes them to the
    /// queue's current `min_vruntime` and `CFS_DEFAULT_WEIGHT`
    /// respectively the first time the task is queued.
    Cfs { vruntime: u64, weight: u32 },
    /// Multi-level feedback queue priority level (carried for future
    /// MLFQ policies; no MLFQ scheduler ships in this core, see
    /// DESIGN.md).
    Mlfq { level: u8 },
}

impl Default for PolicySchedData {
    fn default() -> Self {
        PolicySchedData::Cfs {
            vruntime: 0,
            weight: 0,
        }
    }
}
