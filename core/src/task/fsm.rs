//! Task lifecycle state machine.
//!
//! The FSM is purely declarative: it only says which transitions are
//! legal. `TaskManager` is the sole event producer and performs the
//! side effects (enqueuing, waking, freeing) that accompany a
//! transition. Unexpected events never fail loudly — they log a
//! warning and leave the task in its current state.

use kestrel_lib::klog_warn;

/// One of the seven lifecycle states. Numeric values match
/// `kestrel_abi::task::TaskStateWire` one-for-one.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    UnInit = 0,
    Ready = 1,
    Running = 2,
    Sleeping = 3,
    Blocked = 4,
    Exited = 5,
    Zombie = 6,
}

/// Event messages the task manager feeds into a task's FSM.
#[derive(Clone, Copy, Debug)]
pub enum TaskEvent {
    Schedule,
    Yield,
    Sleep(u64),
    Block(crate::resource::ResourceId),
    Wakeup,
    Exit { has_parent: bool },
    Reap,
}

/// Outcome of feeding an event to the FSM: either the new state, or
/// "ignored" (state unchanged, already logged).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Moved(TaskState),
    Ignored,
}

impl TaskState {
    /// Apply `event`, returning the prescribed transition. This
    /// function has no side effects of its own; the caller (the task
    /// manager) is responsible for enqueuing/blocking/waking as the
    /// new state requires.
    pub fn on_event(self, event: TaskEvent) -> Transition {
        use TaskEvent::*;
        use TaskState::*;

        match (self, event) {
            (UnInit, Schedule) => Transition::Moved(Ready),
            (Ready, Schedule) => Transition::Moved(Running),
            (Running, Yield) => Transition::Moved(Ready),
            (Running, Sleep(_)) => Transition::Moved(Sleeping),
            (Running, Block(_)) => Transition::Moved(Blocked),
            (Sleeping, Wakeup) => Transition::Moved(Ready),
            (Blocked, Wakeup) => Transition::Moved(Ready),
            (Running, Exit { has_parent: true }) => Transition::Moved(Zombie),
            (Running, Exit { has_parent: false }) => Transition::Moved(Exited),
            (Zombie, Reap) => Transition::Moved(Exited),
            _ => {
                klog_warn!(
                    "TaskFsm: state {:?} received unexpected event {:?}",
                    self,
                    event
                );
                Transition::Ignored
            }
        }
    }

    pub const fn wire(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceId, ResourceType};

    #[test]
    fn uninit_schedules_to_ready() {
        assert_eq!(
            TaskState::UnInit.on_event(TaskEvent::Schedule),
            Transition::Moved(TaskState::Ready)
        );
    }

    #[test]
    fn ready_schedules_to_running() {
        assert_eq!(
            TaskState::Ready.on_event(TaskEvent::Schedule),
            Transition::Moved(TaskState::Running)
        );
    }

    #[test]
    fn block_then_wakeup_round_trips_to_ready() {
        let blocked = TaskState::Running
            .on_event(TaskEvent::Block(ResourceId::new(ResourceType::Mutex, 1)));
        assert_eq!(blocked, Transition::Moved(TaskState::Blocked));
        let ready = TaskState::Blocked.on_event(TaskEvent::Wakeup);
        assert_eq!(ready, Transition::Moved(TaskState::Ready));
    }

    #[test]
    fn exit_routes_by_parent_presence() {
        assert_eq!(
            TaskState::Running.on_event(TaskEvent::Exit { has_parent: true }),
            Transition::Moved(TaskState::Zombie)
        );
        assert_eq!(
            TaskState::Running.on_event(TaskEvent::Exit { has_parent: false }),
            Transition::Moved(TaskState::Exited)
        );
    }

    #[test]
    fn zombie_reaps_to_exited() {
        assert_eq!(
            TaskState::Zombie.on_event(TaskEvent::Reap),
            Transition::Moved(TaskState::Exited)
        );
    }

    #[test]
    fn unexpected_event_is_ignored_not_fatal() {
        assert_eq!(
            TaskState::Exited.on_event(TaskEvent::Schedule),
            Transition::Ignored
        );
        assert_eq!(
            TaskState::Ready.on_event(TaskEvent::Wakeup),
            Transition::Ignored
        );
    }
}
