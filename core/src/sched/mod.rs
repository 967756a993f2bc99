//! Scheduling policies : one concrete queueing discipline
//! per `TaskPolicy` slot, plus `FifoScheduler` as a fourth swappable
//! implementation not bound to any slot by default (see DESIGN.md).

pub mod cfs;
pub mod fifo;
pub mod idle;
pub mod policy;
pub mod round_robin;

pub use cfs::CfsScheduler;
pub use fifo::FifoScheduler;
pub use idle::IdleScheduler;
pub use policy::{SchedPolicy, SchedPolicyStats};
pub use round_robin::RoundRobinScheduler;
