//! The single kernel-wide `TaskManager` instance, reachable from
//! contexts that can't carry a reference down the call stack (trap
//! entry, syscall dispatch). Everything else should keep taking
//! `&TaskManager` explicitly and let callers decide whether that's
//! this global or a local instance.

use spin::Once;

use crate::manager::TaskManager;

static TASK_MANAGER: Once<TaskManager> = Once::new();

/// Construct the global `TaskManager`. Must run exactly once, during
/// early boot before any CPU schedules a task.
pub fn init_global(cpu_count: usize) -> &'static TaskManager {
    TASK_MANAGER.call_once(|| TaskManager::new(cpu_count))
}

/// Fetch the global `TaskManager`.
///
/// # Panics
/// Panics if called before [`init_global`]. Every reachable boot path
/// calls `init_global` first; a panic here means boot order was
/// violated, not a normal runtime condition.
pub fn global() -> &'static TaskManager {
    TASK_MANAGER
        .get()
        .expect("TaskManager::global() called before init_global()")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_global_is_idempotent() {
        let a = init_global(1) as *const TaskManager;
        let b = init_global(4) as *const TaskManager;
        assert_eq!(a, b);
    }
}
