//! Per-CPU identity and interrupt-flag primitives.
//!
//! The actual "which core am I, and how do I mask interrupts" question is
//! architecture-specific. Real boot
//! code registers a `CpuHooks` once per architecture; everything above
//! this module only ever calls the three free functions below, so the
//! scheduling core never branches on `target_arch` itself.

use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Hook table an architecture backend installs at boot. `core` crates
/// never see a raw function pointer directly — only through the safe
/// wrappers below.
#[derive(Clone, Copy)]
pub struct CpuHooks {
    pub current_cpu_id: fn() -> usize,
    /// Disable interrupts, returning whether they were previously enabled.
    pub save_flags_cli: fn() -> bool,
    pub restore_flags: fn(bool),
}

static HOOKS: AtomicPtr<CpuHooks> = AtomicPtr::new(core::ptr::null_mut());
static CPU_COUNT: AtomicUsize = AtomicUsize::new(1);

/// Install the architecture's CPU hooks. Must be called exactly once
/// during early boot, before any spinlock is acquired.
pub fn register_cpu_hooks(hooks: &'static CpuHooks) {
    HOOKS.store(hooks as *const CpuHooks as *mut CpuHooks, Ordering::Release);
}

pub fn set_cpu_count(count: usize) {
    CPU_COUNT.store(count.max(1), Ordering::Release);
}

pub fn cpu_count() -> usize {
    CPU_COUNT.load(Ordering::Acquire)
}

#[inline]
fn hooks() -> &'static CpuHooks {
    let ptr = HOOKS.load(Ordering::Acquire);
    if ptr.is_null() {
        &TEST_HOOKS
    } else {
        // SAFETY: only ever set once, to a `'static` reference, by
        // `register_cpu_hooks`.
        unsafe { &*ptr }
    }
}

#[inline]
pub fn current_cpu_id() -> usize {
    (hooks().current_cpu_id)()
}

/// Disable interrupts and return the previously-saved enabled state.
#[inline]
pub fn save_flags_cli() -> bool {
    (hooks().save_flags_cli)()
}

#[inline]
pub fn restore_flags(was_enabled: bool) {
    (hooks().restore_flags)(was_enabled)
}

// ---------------------------------------------------------------------
// Test / no-backend fallback: single simulated CPU, thread-local so
// parallel `cargo test` runs don't trample each other's interrupt state.
// ---------------------------------------------------------------------

#[cfg(test)]
std::thread_local! {
    static TEST_CPU_ID: core::cell::Cell<usize> = const { core::cell::Cell::new(0) };
    static TEST_IRQ_ENABLED: core::cell::Cell<bool> = const { core::cell::Cell::new(true) };
}

#[cfg(test)]
fn test_current_cpu_id() -> usize {
    TEST_CPU_ID.with(|c| c.get())
}

#[cfg(test)]
fn test_save_flags_cli() -> bool {
    TEST_IRQ_ENABLED.with(|c| c.replace(false))
}

#[cfg(test)]
fn test_restore_flags(was_enabled: bool) {
    TEST_IRQ_ENABLED.with(|c| c.set(was_enabled));
}

#[cfg(not(test))]
fn test_current_cpu_id() -> usize {
    0
}

#[cfg(not(test))]
fn test_save_flags_cli() -> bool {
    true
}

#[cfg(not(test))]
fn test_restore_flags(_was_enabled: bool) {}

static TEST_HOOKS: CpuHooks = CpuHooks {
    current_cpu_id: test_current_cpu_id,
    save_flags_cli: test_save_flags_cli,
    restore_flags: test_restore_flags,
};

/// Test-only helper: pretend to be a different CPU for the remainder of
/// this thread, simulating the per-CPU call sites the real boot path
/// would give each core.
#[cfg(test)]
pub fn set_current_cpu_id_for_test(id: usize) {
    TEST_CPU_ID.with(|c| c.set(id));
}
