//! Round-robin scheduler: identical queueing discipline to
//! `FifoScheduler`, but a task whose time slice expires goes back to
//! the tail of the queue instead of staying put.

use alloc::collections::VecDeque;

use crate::sched::policy::SchedPolicy;
use crate::task::PolicySchedData;

#[derive(Default)]
pub struct RoundRobinScheduler {
    queue: VecDeque<u64>,
}

impl RoundRobinScheduler {
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl SchedPolicy for RoundRobinScheduler {
    fn enqueue(&mut self, pid: u64, _policy_data: &mut PolicySchedData) {
        self.queue.push_back(pid);
    }

    fn pick_next(&mut self) -> Option<u64> {
        self.queue.pop_front()
    }

    fn remove(&mut self, pid: u64) {
        self.queue.retain(|&p| p != pid);
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn on_time_slice_expired(&mut self, _pid: u64, _policy_data: &PolicySchedData) -> bool {
        true
    }
}
