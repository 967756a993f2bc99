//! Test-only CPU hook installation.
//!
//! `kestrel_lib::cpu` is a hookable indirection over "which CPU am I,
//! how do I mask interrupts". Unit tests simulate several CPUs on one OS
//! thread by swapping the thread-local "current CPU" before exercising
//! each CPU's slice of state.

use std::cell::Cell;
use std::sync::Once;

use kestrel_lib::cpu::{CpuHooks, register_cpu_hooks};

std::thread_local! {
    static CPU_ID: Cell<usize> = const { Cell::new(0) };
    static IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
}

fn current_cpu_id() -> usize {
    CPU_ID.with(|c| c.get())
}

fn save_flags_cli() -> bool {
    IRQ_ENABLED.with(|c| c.replace(false))
}

fn restore_flags(was_enabled: bool) {
    IRQ_ENABLED.with(|c| c.set(was_enabled));
}

static HOOKS: CpuHooks = CpuHooks {
    current_cpu_id,
    save_flags_cli,
    restore_flags,
};

static INIT: Once = Once::new();

fn ensure_installed() {
    INIT.call_once(|| register_cpu_hooks(&HOOKS));
}

/// Act as CPU `id` for the remainder of this thread.
pub fn set_cpu(id: usize) {
    ensure_installed();
    CPU_ID.with(|c| c.set(id));
    IRQ_ENABLED.with(|c| c.set(true));
}
