//! Tunable constants for the scheduling core, gathered in one place
//! instead of scattered as magic numbers through the modules that use
//! them.

/// Bound on live tasks in the global task table.
pub const MAX_TASKS: usize = 128;

/// Upper bound on CPU cores this build supports.
pub const MAX_CPUS: usize = 32;

/// Default time slice handed to a Normal/RealTime task, in ticks.
pub const DEFAULT_TIME_SLICE_TICKS: u64 = 10;

/// CFS nominal weight (nice value 0).
pub const CFS_DEFAULT_WEIGHT: u32 = 1024;

/// CFS preemption threshold, in vruntime units.
pub const CFS_MIN_GRANULARITY: u64 = 10;

/// Capacity of each per-IRQ work queue.
pub const IRQ_QUEUE_CAPACITY: usize = 256;

/// Capacity of a single blocked-by-resource bucket.
pub const BLOCKED_BUCKET_CAPACITY: usize = 64;

/// Default kernel stack size for a new task.
pub const KERNEL_STACK_SIZE: usize = kestrel_abi::task::TASK_KERNEL_STACK_SIZE;

/// pid reserved for the init task; orphans are reparented to it
///.
pub const INIT_PID: u64 = 1;
