//! Interrupt-disabling spinlock.
//!
//! Non-recursive: a CPU that already holds the lock fails its second
//! `lock()` instead of deadlocking against itself. Acquire/release never
//! panic — both return a success/failure signal, because logging itself
//! must be able to take this lock without recursing into a panic
//! handler that also logs.

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use kestrel_lib::{cpu, klog_warn};

const NO_OWNER: usize = usize::MAX;

pub struct Spinlock<T> {
    locked: AtomicBool,
    owner_cpu: AtomicUsize,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is only ever granted through a `LockGuard`,
// which is only produced after `locked` transitions false -> true with
// acquire ordering.
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

pub struct LockGuard<'a, T> {
    lock: &'a Spinlock<T>,
    irq_was_enabled: bool,
}

impl<T> Spinlock<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            owner_cpu: AtomicUsize::new(NO_OWNER),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Acquire the lock, spinning until available. Returns `None` if the
    /// current CPU already holds this lock (a programmer error, logged
    /// and never a panic).
    pub fn lock(&self) -> Option<LockGuard<'_, T>> {
        let irq_was_enabled = cpu::save_flags_cli();
        let this_cpu = cpu::current_cpu_id();

        if self.owner_cpu.load(Ordering::Acquire) == this_cpu {
            cpu::restore_flags(irq_was_enabled);
            klog_warn!("Spinlock: recursive acquire refused on cpu {}", this_cpu);
            return None;
        }

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }
        self.owner_cpu.store(this_cpu, Ordering::Release);

        Some(LockGuard {
            lock: self,
            irq_was_enabled,
        })
    }

    /// Single-attempt, non-spinning acquire.
    pub fn try_lock(&self) -> Option<LockGuard<'_, T>> {
        let irq_was_enabled = cpu::save_flags_cli();
        let this_cpu = cpu::current_cpu_id();

        if self.owner_cpu.load(Ordering::Acquire) == this_cpu {
            cpu::restore_flags(irq_was_enabled);
            klog_warn!("Spinlock: recursive try_lock refused on cpu {}", this_cpu);
            return None;
        }

        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            cpu::restore_flags(irq_was_enabled);
            return None;
        }
        self.owner_cpu.store(this_cpu, Ordering::Release);

        Some(LockGuard {
            lock: self,
            irq_was_enabled,
        })
    }
}

impl<'a, T> Deref for LockGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: holding a `LockGuard` is proof of exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for LockGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding a `LockGuard` is proof of exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for LockGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.owner_cpu.store(NO_OWNER, Ordering::Release);
        self.lock.locked.store(false, Ordering::Release);
        cpu::restore_flags(self.irq_was_enabled);
    }
}
