//! Blocking mutex: unlike `Spinlock`, a task that cannot
//! acquire this lock is taken off its run-queue entirely and parked on
//! the lock's own wait list, woken by `TaskManager::wakeup` when the
//! owner releases. Needs a `TaskManager` to block/wake against, so
//! every method takes an explicit `&TaskManager` rather than reaching
//! for a global singleton.
//!
//! Non-recursive, matching `Spinlock`: a task that already owns this
//! mutex fails its second `lock()` instead of pushing itself onto its
//! own waiter list and blocking forever.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use alloc::vec::Vec;

use kestrel_lib::klog_warn;

use crate::manager::TaskManager;
use crate::resource::{ResourceId, ResourceType};
use crate::sync::spinlock::Spinlock;

struct MutexState {
    owner: Option<u64>,
    waiters: Vec<u64>,
}

pub struct Mutex<T> {
    resource_id: ResourceId,
    state: Spinlock<MutexState>,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    mgr: &'a TaskManager,
}

impl<T> Mutex<T> {
    pub fn new(data: T) -> Self {
        let addr = &data as *const T as u64;
        Self {
            resource_id: ResourceId::new(ResourceType::Mutex, addr),
            state: Spinlock::new(MutexState {
                owner: None,
                waiters: Vec::new(),
            }),
            data: UnsafeCell::new(data),
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Whether the task currently running (per `mgr`) already owns this
    /// mutex.
    pub fn is_locked_by_current_task(&self, mgr: &TaskManager) -> bool {
        let current = mgr.current_task_id();
        self.state
            .lock()
            .expect("mutex state spinlock recursively acquired")
            .owner
            == Some(current)
    }

    /// Acquire the lock, blocking the calling task (per `mgr`) if it is
    /// already held. Loops on wakeup to guard against spurious wakes
    /// racing a third task's acquire. Returns `None`, logged, if the
    /// calling task already owns this mutex rather than deadlocking it
    /// against its own waiter list.
    pub fn lock<'a>(&'a self, mgr: &'a TaskManager) -> Option<MutexGuard<'a, T>> {
        loop {
            let current = mgr.current_task_id();
            {
                let mut guard = self.state.lock().expect("mutex state spinlock recursively acquired");
                if guard.owner == Some(current) {
                    klog_warn!("Mutex: recursive lock refused for task {}", current);
                    return None;
                }
                if guard.owner.is_none() {
                    guard.owner = Some(current);
                    return Some(MutexGuard { mutex: self, mgr });
                }
                guard.waiters.push(current);
            }
            mgr.block_current(self.resource_id);
        }
    }

    /// Single-attempt, non-blocking acquire.
    pub fn try_lock<'a>(&'a self, mgr: &'a TaskManager) -> Option<MutexGuard<'a, T>> {
        let mut guard = self.state.lock()?;
        if guard.owner.is_some() {
            return None;
        }
        guard.owner = Some(mgr.current_task_id());
        Some(MutexGuard { mutex: self, mgr })
    }

    fn unlock(&self, mgr: &TaskManager) {
        let mut guard = self.state.lock().expect("mutex state spinlock recursively acquired");
        guard.owner = None;
        if !guard.waiters.is_empty() {
            let next = guard.waiters.remove(0);
            drop(guard);
            mgr.wakeup(next, self.resource_id);
        }
    }
}

impl<'a, T> Deref for MutexGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: holding a `MutexGuard` is proof of exclusive access.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for MutexGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding a `MutexGuard` is proof of exclusive access.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for MutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.unlock(self.mgr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::TaskManager;

    #[test]
    fn uncontended_lock_round_trips() {
        let mgr = TaskManager::new_for_test(1);
        let mutex = Mutex::new(0u32);
        {
            let mut guard = mutex.lock(&mgr).unwrap();
            *guard += 1;
        }
        let guard = mutex.lock(&mgr).unwrap();
        assert_eq!(*guard, 1);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let mgr = TaskManager::new_for_test(1);
        let mutex = Mutex::new(0u32);
        let _guard = mutex.lock(&mgr).unwrap();
        assert!(mutex.try_lock(&mgr).is_none());
    }

    #[test]
    fn self_recursive_lock_fails_fast_instead_of_deadlocking() {
        let mgr = TaskManager::new_for_test(1);
        let mutex = Mutex::new(0u32);
        let _guard = mutex.lock(&mgr).unwrap();
        assert!(mutex.is_locked_by_current_task(&mgr));
        assert!(mutex.lock(&mgr).is_none());
    }
}
