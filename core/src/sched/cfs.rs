//! Completely-fair scheduler: orders runnable tasks by virtual
//! runtime, always picking the smallest.

use core::cmp::Reverse;

use alloc::collections::BinaryHeap;

use crate::config::{CFS_DEFAULT_WEIGHT, CFS_MIN_GRANULARITY};
use crate::sched::policy::SchedPolicy;
use crate::task::PolicySchedData;

/// How far a task's vruntime advances per tick it holds the CPU,
/// scaled inversely by its weight so heavier tasks advance slower and
/// therefore get picked more often.
pub fn vruntime_delta(weight: u32) -> u64 {
    let weight = weight.max(1) as u64;
    (1024 * 1000) / weight
}

/// Minimum ticks a task is guaranteed before it can be preempted by a
/// lower-vruntime task, even if one exists.
pub const MIN_GRANULARITY: u64 = CFS_MIN_GRANULARITY;

#[derive(Default)]
pub struct CfsScheduler {
    heap: BinaryHeap<Reverse<(u64, u64)>>,
    /// Vruntime of the current queue head, or of the last task to leave
    /// an empty queue. Newly enqueued tasks with no vruntime of their
    /// own are bootstrapped to this value so they can't claim a huge
    /// share of the CPU just by having just arrived.
    min_vruntime: u64,
}

impl CfsScheduler {
    pub const fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            min_vruntime: 0,
        }
    }

    fn update_min_vruntime_after_pop(&mut self, popped_vruntime: u64) {
        self.min_vruntime = match self.heap.peek() {
            Some(Reverse((head_vruntime, _))) => *head_vruntime,
            None => popped_vruntime,
        };
    }
}

impl SchedPolicy for CfsScheduler {
    fn enqueue(&mut self, pid: u64, policy_data: &mut PolicySchedData) {
        let PolicySchedData::Cfs { vruntime, weight } = policy_data else {
            self.heap.push(Reverse((self.min_vruntime, pid)));
            return;
        };
        if *weight == 0 {
            *weight = CFS_DEFAULT_WEIGHT;
        }
        if *vruntime == 0 {
            *vruntime = self.min_vruntime;
        }
        self.heap.push(Reverse((*vruntime, pid)));
    }

    fn pick_next(&mut self) -> Option<u64> {
        let Reverse((vruntime, pid)) = self.heap.pop()?;
        self.update_min_vruntime_after_pop(vruntime);
        Some(pid)
    }

    fn remove(&mut self, pid: u64) {
        self.heap.retain(|Reverse((_, p))| *p != pid);
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn on_tick(&mut self, current: &mut PolicySchedData) -> bool {
        let PolicySchedData::Cfs { vruntime, weight } = current else {
            return false;
        };
        *vruntime += vruntime_delta(*weight);
        match self.heap.peek() {
            Some(Reverse((head_vruntime, _))) => head_vruntime.saturating_add(MIN_GRANULARITY) < *vruntime,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smaller_vruntime_runs_first() {
        let mut sched = CfsScheduler::new();
        sched.enqueue(
            1,
            &mut PolicySchedData::Cfs {
                vruntime: 500,
                weight: 1024,
            },
        );
        sched.enqueue(
            2,
            &mut PolicySchedData::Cfs {
                vruntime: 100,
                weight: 1024,
            },
        );
        assert_eq!(sched.pick_next(), Some(2));
        assert_eq!(sched.pick_next(), Some(1));
    }

    #[test]
    fn heavier_weight_advances_vruntime_slower() {
        assert!(vruntime_delta(2048) < vruntime_delta(1024));
        assert_eq!(vruntime_delta(1024), (1024 * 1000) / 1024);
    }

    #[test]
    fn vruntime_advance_ratio_matches_inverse_weight_ratio_over_ten_ticks() {
        let mut a_vruntime = 0u64;
        let mut b_vruntime = 0u64;
        for _ in 0..10 {
            a_vruntime += vruntime_delta(2048);
            b_vruntime += vruntime_delta(512);
        }
        assert_eq!(a_vruntime, 5000);
        assert_eq!(b_vruntime, 20000);
        assert!(b_vruntime - a_vruntime <= 20000);
    }

    #[test]
    fn new_task_bootstraps_vruntime_to_queue_min() {
        let mut sched = CfsScheduler::new();
        sched.enqueue(
            1,
            &mut PolicySchedData::Cfs {
                vruntime: 5_000,
                weight: 1024,
            },
        );
        assert_eq!(sched.pick_next(), Some(1));
        // Queue is now empty, but min_vruntime carries forward from the
        // task that just left it.
        let mut fresh = PolicySchedData::Cfs {
            vruntime: 0,
            weight: 1024,
        };
        sched.enqueue(2, &mut fresh);
        assert_eq!(fresh, PolicySchedData::Cfs {
            vruntime: 5_000,
            weight: 1024,
        });
    }

    #[test]
    fn zero_weight_is_normalized_to_default() {
        let mut sched = CfsScheduler::new();
        let mut data = PolicySchedData::Cfs {
            vruntime: 100,
            weight: 0,
        };
        sched.enqueue(1, &mut data);
        assert_eq!(data, PolicySchedData::Cfs {
            vruntime: 100,
            weight: CFS_DEFAULT_WEIGHT,
        });
    }

    #[test]
    fn on_tick_preempts_only_once_head_is_far_enough_ahead() {
        let mut far_ahead_head = CfsScheduler::new();
        far_ahead_head.enqueue(
            1,
            &mut PolicySchedData::Cfs {
                vruntime: 1_000_000,
                weight: 1024,
            },
        );
        let mut current = PolicySchedData::Cfs {
            vruntime: 0,
            weight: 1024,
        };
        assert!(!far_ahead_head.on_tick(&mut current));
        let PolicySchedData::Cfs { vruntime, .. } = current else {
            unreachable!()
        };
        assert_eq!(vruntime, vruntime_delta(1024));

        let mut caught_up_head = CfsScheduler::new();
        caught_up_head.enqueue(
            2,
            &mut PolicySchedData::Cfs {
                vruntime: 0,
                weight: 1024,
            },
        );
        let mut current = PolicySchedData::Cfs {
            vruntime: 20,
            weight: 1024,
        };
        assert!(caught_up_head.on_tick(&mut current));
    }
}
