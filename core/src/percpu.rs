//! Per-CPU scheduling state: each CPU owns one run
//! queue set (one queue per `TaskPolicy`), its own sleep/blocked
//! bookkeeping, and a tick counter, all behind a single spinlock so a
//! timer interrupt and a cross-CPU balance pass never race each other.

use core::cmp::Reverse;

use alloc::collections::{BTreeMap, BinaryHeap, VecDeque};
use alloc::vec::Vec;

use crate::resource::ResourceId;
use crate::sched::{CfsScheduler, IdleScheduler, RoundRobinScheduler, SchedPolicy};
use crate::sync::Spinlock;
use crate::task::{PolicySchedData, TaskPolicy};

struct PerCpuState {
    realtime: RoundRobinScheduler,
    normal: CfsScheduler,
    idle: IdleScheduler,
    sleeping: BinaryHeap<Reverse<(u64, u64)>>,
    blocked: BTreeMap<ResourceId, VecDeque<u64>>,
    local_tick: u64,
    running: Option<u64>,
    schedule_count: u64,
    idle_count: u64,
}

pub struct PerCpuRunQueue {
    pub cpu_id: usize,
    state: Spinlock<PerCpuState>,
}

impl PerCpuRunQueue {
    pub fn new(cpu_id: usize) -> Self {
        Self {
            cpu_id,
            state: Spinlock::new(PerCpuState {
                realtime: RoundRobinScheduler::new(),
                normal: CfsScheduler::new(),
                idle: IdleScheduler::new(),
                sleeping: BinaryHeap::new(),
                blocked: BTreeMap::new(),
                local_tick: 0,
                running: None,
                schedule_count: 0,
                idle_count: 0,
            }),
        }
    }

    pub fn install_idle_task(&self, pid: u64) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.idle.install(pid);
    }

    pub fn enqueue(&self, pid: u64, policy: TaskPolicy, policy_data: &mut PolicySchedData) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        match policy {
            TaskPolicy::RealTime => guard.realtime.enqueue(pid, policy_data),
            TaskPolicy::Normal => guard.normal.enqueue(pid, policy_data),
            TaskPolicy::Idle => guard.idle.enqueue(pid, policy_data),
        }
    }

    /// Drive the running task's policy-specific per-tick bookkeeping
    /// (CFS vruntime advance) and report whether it should be preempted
    /// right now, ahead of its time slice running out.
    pub fn on_tick(&self, policy: TaskPolicy, policy_data: &mut PolicySchedData) -> bool {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        match policy {
            TaskPolicy::RealTime => guard.realtime.on_tick(policy_data),
            TaskPolicy::Normal => guard.normal.on_tick(policy_data),
            TaskPolicy::Idle => guard.idle.on_tick(policy_data),
        }
    }

    /// Whether a task whose time slice just expired should be requeued
    /// onto its own policy's queue.
    pub fn on_time_slice_expired(&self, pid: u64, policy: TaskPolicy, policy_data: &PolicySchedData) -> bool {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        match policy {
            TaskPolicy::RealTime => guard.realtime.on_time_slice_expired(pid, policy_data),
            TaskPolicy::Normal => guard.normal.on_time_slice_expired(pid, policy_data),
            TaskPolicy::Idle => guard.idle.on_time_slice_expired(pid, policy_data),
        }
    }

    /// Statistics hook: `pid` was forced off the CPU ahead of its time
    /// slice expiring.
    pub fn on_preempted(&self, pid: u64, policy: TaskPolicy) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        match policy {
            TaskPolicy::RealTime => guard.realtime.on_preempted(pid),
            TaskPolicy::Normal => guard.normal.on_preempted(pid),
            TaskPolicy::Idle => guard.idle.on_preempted(pid),
        }
    }

    /// Statistics hook: `pid` was just picked and is about to run.
    pub fn on_scheduled(&self, pid: u64, policy: TaskPolicy) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        match policy {
            TaskPolicy::RealTime => guard.realtime.on_scheduled(pid),
            TaskPolicy::Normal => guard.normal.on_scheduled(pid),
            TaskPolicy::Idle => guard.idle.on_scheduled(pid),
        }
    }

    /// Pick the next task to run, scanning policies in priority order
    ///; falls back to the
    /// idle task when every real queue is empty.
    pub fn pick_next(&self) -> Option<u64> {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        let picked = guard
            .realtime
            .pick_next()
            .or_else(|| guard.normal.pick_next())
            .or_else(|| guard.idle.pick_next());
        if picked.is_some() {
            guard.schedule_count += 1;
        }
        picked
    }

    pub fn set_running(&self, pid: Option<u64>) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.running = pid;
    }

    pub fn running(&self) -> Option<u64> {
        self.state
            .lock()
            .expect("percpu spinlock recursively acquired")
            .running
    }

    pub fn remove(&self, pid: u64) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.realtime.remove(pid);
        guard.normal.remove(pid);
        guard.idle.remove(pid);
        guard.sleeping.retain(|Reverse((_, p))| *p != pid);
        for waiters in guard.blocked.values_mut() {
            waiters.retain(|&p| p != pid);
        }
    }

    pub fn sleep_until(&self, pid: u64, wake_tick: u64) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.sleeping.push(Reverse((wake_tick, pid)));
    }

    /// Park `pid` on `resource`'s wait bucket. Buckets are bounded
    ///; a bucket at
    /// capacity drops the newest waiter and logs rather than growing
    /// unbounded.
    pub fn block_on(&self, pid: u64, resource: ResourceId) {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        let bucket = guard.blocked.entry(resource).or_default();
        if bucket.len() >= crate::config::BLOCKED_BUCKET_CAPACITY {
            kestrel_lib::klog_warn!(
                "PerCpuRunQueue: blocked bucket for {:?} full, dropping waiter {}",
                resource,
                pid
            );
            return;
        }
        bucket.push_back(pid);
    }

    /// Remove one specific waiter from `resource`'s queue, if present
    /// here. Returns whether it was found.
    pub fn remove_waiter(&self, resource: ResourceId, pid: u64) -> bool {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        let Some(waiters) = guard.blocked.get_mut(&resource) else {
            return false;
        };
        let before = waiters.len();
        waiters.retain(|&p| p != pid);
        let removed = waiters.len() != before;
        if waiters.is_empty() {
            guard.blocked.remove(&resource);
        }
        removed
    }

    /// Remove and return every task waiting on `resource`.
    pub fn drain_waiters(&self, resource: ResourceId) -> Vec<u64> {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard
            .blocked
            .remove(&resource)
            .map(|dq| dq.into_iter().collect())
            .unwrap_or_default()
    }

    /// Advance the local tick by one and return every task whose sleep
    /// has expired.
    pub fn tick(&self) -> Vec<u64> {
        let mut guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.local_tick += 1;
        let now = guard.local_tick;
        let mut woken = Vec::new();
        while let Some(&Reverse((wake_tick, _))) = guard.sleeping.peek() {
            if wake_tick > now {
                break;
            }
            let Reverse((_, pid)) = guard.sleeping.pop().unwrap();
            woken.push(pid);
        }
        woken
    }

    pub fn local_tick(&self) -> u64 {
        self.state.lock().expect("percpu spinlock recursively acquired").local_tick
    }

    pub fn note_idle(&self) {
        self.state.lock().expect("percpu spinlock recursively acquired").idle_count += 1;
    }

    pub fn counters(&self) -> (u64, u64) {
        let guard = self.state.lock().expect("percpu spinlock recursively acquired");
        (guard.schedule_count, guard.idle_count)
    }

    pub fn total_runnable(&self) -> usize {
        let guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.realtime.len() + guard.normal.len() + guard.idle.len()
    }

    /// Whether both real-time and normal queues are empty (the idle slot
    /// doesn't count — it's always available and never worth stealing
    /// for).
    pub fn real_queues_empty(&self) -> bool {
        let guard = self.state.lock().expect("percpu spinlock recursively acquired");
        guard.realtime.is_empty() && guard.normal.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    #[test]
    fn real_time_preempts_normal_and_idle() {
        let rq = PerCpuRunQueue::new(0);
        rq.install_idle_task(0);
        rq.enqueue(2, TaskPolicy::Normal, &mut PolicySchedData::default());
        rq.enqueue(
            1,
            TaskPolicy::RealTime,
            &mut PolicySchedData::Mlfq { level: 0 },
        );
        assert_eq!(rq.pick_next(), Some(1));
        assert_eq!(rq.pick_next(), Some(2));
        assert_eq!(rq.pick_next(), Some(0));
    }

    #[test]
    fn sleep_wakes_exactly_at_target_tick() {
        let rq = PerCpuRunQueue::new(0);
        rq.sleep_until(5, 3);
        assert!(rq.tick().is_empty());
        assert!(rq.tick().is_empty());
        assert_eq!(rq.tick(), alloc::vec![5]);
    }

    #[test]
    fn block_then_drain_returns_all_waiters() {
        let rq = PerCpuRunQueue::new(0);
        let resource = ResourceId::new(ResourceType::Mutex, 1);
        rq.block_on(10, resource);
        rq.block_on(11, resource);
        assert_eq!(rq.drain_waiters(resource), alloc::vec![10, 11]);
        assert!(rq.drain_waiters(resource).is_empty());
    }
}
