//! The idle policy: every CPU always has exactly one idle task id
//! registered, picked only when every other policy's queue is empty.
//! It is never requeued or removed by scheduling traffic, only
//! installed once at core init.

use crate::sched::policy::SchedPolicy;
use crate::task::PolicySchedData;

#[derive(Default)]
pub struct IdleScheduler {
    idle_pid: Option<u64>,
}

impl IdleScheduler {
    pub const fn new() -> Self {
        Self { idle_pid: None }
    }

    pub fn install(&mut self, pid: u64) {
        self.idle_pid = Some(pid);
    }
}

impl SchedPolicy for IdleScheduler {
    fn enqueue(&mut self, pid: u64, _policy_data: &mut PolicySchedData) {
        self.idle_pid = Some(pid);
    }

    fn pick_next(&mut self) -> Option<u64> {
        self.idle_pid
    }

    fn remove(&mut self, pid: u64) {
        if self.idle_pid == Some(pid) {
            self.idle_pid = None;
        }
    }

    fn len(&self) -> usize {
        usize::from(self.idle_pid.is_some())
    }

    fn on_time_slice_expired(&mut self, _pid: u64, _policy_data: &PolicySchedData) -> bool {
        false
    }
}
