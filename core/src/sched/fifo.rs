//! First-in-first-out scheduler: a task that starts running keeps the
//! CPU until it yields, blocks, sleeps, or exits. `requeue` is a no-op
//! override since a FIFO task is never interrupted by a time-slice
//! expiry.

use alloc::collections::VecDeque;

use crate::sched::policy::SchedPolicy;
use crate::task::PolicySchedData;

#[derive(Default)]
pub struct FifoScheduler {
    queue: VecDeque<u64>,
}

impl FifoScheduler {
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl SchedPolicy for FifoScheduler {
    fn enqueue(&mut self, pid: u64, _policy_data: &mut PolicySchedData) {
        self.queue.push_back(pid);
    }

    fn pick_next(&mut self) -> Option<u64> {
        self.queue.pop_front()
    }

    fn requeue(&mut self, _pid: u64, _policy_data: &mut PolicySchedData) {
        // A FIFO task already holds the CPU past its nominal slice; it
        // is only re-enqueued explicitly (e.g. after waking up), never
        // by the tick-driven preemption path.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_preserves_arrival_order() {
        let mut sched = FifoScheduler::new();
        let mut data = PolicySchedData::default();
        sched.enqueue(1, &mut data);
        sched.enqueue(2, &mut data);
        sched.enqueue(3, &mut data);
        assert_eq!(sched.pick_next(), Some(1));
        assert_eq!(sched.pick_next(), Some(2));
        assert_eq!(sched.pick_next(), Some(3));
        assert_eq!(sched.pick_next(), None);
    }

    #[test]
    fn requeue_is_a_no_op() {
        let mut sched = FifoScheduler::new();
        let mut data = PolicySchedData::default();
        sched.enqueue(1, &mut data);
        sched.pick_next();
        sched.requeue(1, &mut data);
        assert!(sched.is_empty());
    }
}
