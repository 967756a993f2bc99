//! The pluggable per-policy ordering trait.
//!
//! Scheduler implementations never own `Task` values — the task table
//! in `TaskManager` does that. A policy only orders task ids,
//! consulting the task's own `PolicySchedData` for whatever ordering
//! key it needs.

use crate::task::PolicySchedData;

/// Scheduling statistics a policy can report about its own queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedPolicyStats {
    pub runnable: usize,
}

pub trait SchedPolicy: Send {
    /// Insert a runnable task into this policy's queue. Takes the task's
    /// policy data mutably: CFS bootstraps a fresh task's `vruntime` and
    /// `weight` here, and the mutation must be visible to the caller's
    /// copy of `Task::policy_data`.
    fn enqueue(&mut self, pid: u64, policy_data: &mut PolicySchedData);

    /// Remove and return the next task to run, if any.
    fn pick_next(&mut self) -> Option<u64>;

    /// Put a task that was running back into the queue (end of its time
    /// slice, or preempted). `FifoScheduler` ignores this: a FIFO task
    /// runs to completion and is never requeued by the tick path.
    fn requeue(&mut self, pid: u64, policy_data: &mut PolicySchedData) {
        self.enqueue(pid, policy_data);
    }

    /// Drop a task id from the queue without running it (used when a
    /// task exits, sleeps, or blocks while still queued).
    fn remove(&mut self, pid: u64);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the currently-running task's policy-specific bookkeeping
    /// by one tick and report whether it should be preempted right now,
    /// ahead of its time slice running out. FIFO and round-robin have no
    /// such rule and always return `false`; CFS compares the running
    /// task's vruntime against its queue head.
    fn on_tick(&mut self, _current: &mut PolicySchedData) -> bool {
        false
    }

    /// A task's time slice just ran out while this policy owned it.
    /// Returns whether it should go back onto this policy's queue.
    fn on_time_slice_expired(&mut self, _pid: u64, _policy_data: &PolicySchedData) -> bool {
        true
    }

    /// A task was forced off the CPU ahead of its time slice expiring
    /// (`on_tick` returned `true`). Statistics hook only.
    fn on_preempted(&mut self, _pid: u64) {}

    /// A task was just picked and is about to run. Statistics hook only.
    fn on_scheduled(&mut self, _pid: u64) {}

    /// Temporarily raise a task's effective priority, e.g. for priority
    /// inheritance while it holds a contended mutex. No-op for policies
    /// without a priority axis.
    fn boost_priority(&mut self, _pid: u64, _new_priority: u8) {}

    /// Undo a prior `boost_priority`, restoring the task's base priority.
    fn restore_priority(&mut self, _pid: u64) {}

    /// Scheduling statistics for this policy's queue.
    fn stats(&self) -> SchedPolicyStats {
        SchedPolicyStats { runnable: self.len() }
    }
}
