//! Interrupt-thread dispatch: hardware IRQs are handed off
//! to ordinary kernel tasks rather than serviced inline, so interrupt
//! handling participates in the same scheduling and blocking model as
//! everything else. An MPMC-ish queue per IRQ line holds pending
//! deliveries; `kestrel_lib::ring_buffer::RingBuffer` gives it a fixed,
//! allocation-free capacity, matching how interrupt contexts can't
//! safely allocate.

use alloc::collections::BTreeMap;

use kestrel_lib::klog_warn;
use kestrel_lib::ring_buffer::RingBuffer;

use crate::config::IRQ_QUEUE_CAPACITY;
use crate::manager::TaskManager;
use crate::resource::{ResourceId, ResourceType};
use crate::sync::Spinlock;

/// One pending interrupt delivery: the IRQ number and a hardware
/// timestamp/cookie opaque to this core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrqEvent {
    pub irq: u32,
    pub cookie: u64,
}

struct IrqLine {
    queue: RingBuffer<IrqEvent, IRQ_QUEUE_CAPACITY>,
    handler_task: Option<u64>,
}

impl Default for IrqLine {
    fn default() -> Self {
        Self {
            queue: RingBuffer::default(),
            handler_task: None,
        }
    }
}

pub struct InterruptDispatch {
    lines: Spinlock<BTreeMap<u32, IrqLine>>,
}

impl Default for InterruptDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptDispatch {
    pub fn new() -> Self {
        Self {
            lines: Spinlock::new(BTreeMap::new()),
        }
    }

    fn resource_for(irq: u32) -> ResourceId {
        ResourceId::new(ResourceType::Interrupt, irq as u64)
    }

    /// Bind a kernel task to service `irq`.
    pub fn bind_handler(&self, irq: u32, task_pid: u64) {
        let mut lines = self
            .lines
            .lock()
            .expect("interrupt dispatch spinlock recursively acquired");
        lines.entry(irq).or_default().handler_task = Some(task_pid);
    }

    /// Called from interrupt context: enqueue the event and wake the
    /// bound handler task, if any. Drops the event and logs if the line's queue is
    /// full rather than blocking the interrupt path.
    pub fn dispatch(&self, mgr: &TaskManager, event: IrqEvent) {
        let handler = {
            let mut lines = self
                .lines
                .lock()
                .expect("interrupt dispatch spinlock recursively acquired");
            let line = lines.entry(event.irq).or_default();
            if line.queue.try_push(event).is_err() {
                klog_warn!("InterruptDispatch: irq {} queue full, dropping event", event.irq);
            }
            line.handler_task
        };

        if let Some(pid) = handler {
            mgr.wakeup(pid, Self::resource_for(event.irq));
        }
    }

    /// Called by the bound handler task after being woken: drain one
    /// pending event for `irq`, if any, else park on the line's
    /// resource id until the next `dispatch`.
    pub fn next_event(&self, mgr: &TaskManager, irq: u32) -> Option<IrqEvent> {
        let popped = {
            let mut lines = self
                .lines
                .lock()
                .expect("interrupt dispatch spinlock recursively acquired");
            lines.entry(irq).or_default().queue.try_pop()
        };
        if popped.is_none() {
            mgr.block_current(Self::resource_for(irq));
        }
        popped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::TaskManager;

    #[test]
    fn dispatch_wakes_bound_handler_and_delivers_event() {
        let mgr = TaskManager::new_for_test(1);
        mgr.init_current_core(0).unwrap();
        let handler_pid = mgr
            .add_task("irq-handler", crate::task::TaskPolicy::RealTime, 0)
            .unwrap();
        let dispatch = InterruptDispatch::new();
        dispatch.bind_handler(7, handler_pid);

        dispatch.dispatch(&mgr, IrqEvent { irq: 7, cookie: 42 });
        let event = dispatch.next_event(&mgr, 7).unwrap();
        assert_eq!(event.cookie, 42);
        assert!(dispatch.next_event(&mgr, 7).is_none());
    }

    #[test]
    fn full_queue_drops_events_without_panicking() {
        let mgr = TaskManager::new_for_test(1);
        let dispatch = InterruptDispatch::new();
        for i in 0..(IRQ_QUEUE_CAPACITY as u64 + 4) {
            dispatch.dispatch(&mgr, IrqEvent { irq: 1, cookie: i });
        }
        let mut drained = 0;
        while dispatch.next_event(&mgr, 1).is_some() {
            drained += 1;
        }
        assert_eq!(drained, IRQ_QUEUE_CAPACITY);
    }
}
