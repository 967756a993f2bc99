//! The task control block itself.

use alloc::sync::Arc;

use kestrel_abi::CloneFlags;

use crate::resource::ResourceId;
use crate::task::fsm::TaskState;
use crate::task::policy::{PolicySchedData, TaskPolicy};
use crate::task::stack::KernelStack;

/// Architecture-neutral register-save area. Real layout is
/// architecture-specific and out of scope; this core only
/// needs somewhere to park bytes across a context switch.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SwitchContext {
    pub regs: [u64; 8],
}

/// Opaque handle to whatever file-descriptor table collaborator owns;
/// this core does not implement file descriptors, it only tracks
/// sharing per `CloneFlags::FILES`.
#[derive(Debug, Default)]
pub struct FdTableHandle;

pub struct Task {
    pub pid: u64,
    pub tgid: u64,
    pub parent_pid: u64,
    pub pgid: u64,
    pub sid: u64,

    pub state: TaskState,
    pub policy: TaskPolicy,
    pub policy_data: PolicySchedData,

    pub priority: u8,
    pub base_priority: u8,

    pub time_slice_remaining: u64,
    pub time_slice_default: u64,
    pub total_runtime: u64,
    pub context_switches: u64,
    pub wake_tick: u64,

    pub kernel_stack: KernelStack,
    pub switch_ctx: SwitchContext,
    pub trap_context: *mut u8,
    pub page_table_root: Option<u64>,

    pub cpu_affinity: u64,
    pub blocked_on: ResourceId,
    pub irq_binding: Option<u32>,
    pub fd_table: Option<Arc<FdTableHandle>>,

    pub exit_code: i32,
    pub name: [u8; kestrel_abi::task::TASK_NAME_MAX_LEN],
}

impl Task {
    pub fn new(pid: u64, name: &str, policy: TaskPolicy, stack: KernelStack) -> Self {
        let mut name_buf = [0u8; kestrel_abi::task::TASK_NAME_MAX_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(name_buf.len());
        name_buf[..len].copy_from_slice(&bytes[..len]);

        let trap_context = stack.top();

        Self {
            pid,
            tgid: pid,
            parent_pid: kestrel_abi::task::INVALID_TASK_ID,
            pgid: pid,
            sid: pid,
            state: TaskState::UnInit,
            policy,
            policy_data: PolicySchedData::default(),
            priority: 0,
            base_priority: 0,
            time_slice_remaining: 0,
            time_slice_default: crate::config::DEFAULT_TIME_SLICE_TICKS,
            total_runtime: 0,
            context_switches: 0,
            wake_tick: 0,
            kernel_stack: stack,
            switch_ctx: SwitchContext::default(),
            trap_context,
            page_table_root: None,
            cpu_affinity: u64::MAX,
            blocked_on: ResourceId::NONE,
            irq_binding: None,
            fd_table: None,
            exit_code: 0,
            name: name_buf,
        }
    }

    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..end]).unwrap_or("<invalid>")
    }

    pub fn is_thread_of(&self, other: &Task) -> bool {
        self.tgid == other.tgid
    }

    /// Apply `flags` to decide what a clone of this task shares versus
    /// copies. Sharing `fd_table` is the only effect this
    /// core implements directly; VM/FS sharing belong to collaborators
    /// outside this core's scope.
    pub fn inherit_for_clone(&self, flags: CloneFlags) -> Option<Arc<FdTableHandle>> {
        if flags.contains(CloneFlags::FILES) {
            self.fd_table.clone()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> KernelStack {
        KernelStack::new(4096).unwrap()
    }

    #[test]
    fn new_task_starts_uninit_and_is_its_own_group_leader() {
        let task = Task::new(7, "init", TaskPolicy::Normal, stack());
        assert_eq!(task.state, TaskState::UnInit);
        assert_eq!(task.tgid, 7);
        assert_eq!(task.pgid, 7);
        assert_eq!(task.sid, 7);
        assert_eq!(task.name(), "init");
    }

    #[test]
    fn long_name_is_truncated_not_rejected() {
        let long = "a".repeat(64);
        let task = Task::new(1, &long, TaskPolicy::Normal, stack());
        assert_eq!(task.name().len(), kestrel_abi::task::TASK_NAME_MAX_LEN);
    }

    #[test]
    fn thread_of_checks_shared_tgid() {
        let mut a = Task::new(1, "a", TaskPolicy::Normal, stack());
        let b = Task::new(2, "b", TaskPolicy::Normal, stack());
        assert!(!a.is_thread_of(&b));
        a.tgid = b.tgid;
        assert!(a.is_thread_of(&b));
    }
}
