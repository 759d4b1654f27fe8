//! The dynamic scheduler: completion tables, the two concurrent queues, and
//! the busy-polling worker pool.
//!
//! ```text
//! Ready ── pop ──▶ run kernel ──▶ set dependency bit ──▶ fan out successors
//!   ▲                                                          │
//!   └── promote ◀── recheck left dep ◀── Wait ◀── not ready ◀──┘
//! ```
//!
//! Every queue operation is non-blocking; workers spin until the dependency
//! bit of the last diagonal tile is set or the cooperative abort flag fires.

pub mod dependency;
pub mod queue;
pub mod worker;

pub use dependency::{DependencyTable, StatusTable, TaskStatus};
pub use queue::{ReadyQueue, WaitQueue};
pub use worker::{BreakdownEvent, RunReport};
