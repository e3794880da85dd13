//! # Talos Execution Subsystem
//!
//! The execution subsystem manages:
//! - Task descriptors (period, deadline, priority, criticality, history)
//! - The fixed-capacity task registry and its lifecycle operations
//!
//! Tasks are never destroyed: a deleted task keeps its slot and id, marked
//! inactive. The id of a task is its slot index for the life of the system.

#![warn(missing_docs)]

pub mod registry;
pub mod task;

pub use registry::TaskRegistry;
pub use task::{Task, TaskEntry, TaskId};

/// Execution subsystem result type.
pub type ExecResult<T> = Result<T, ExecError>;

/// Execution subsystem errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// Invalid parameter (unknown task id, priority out of range, empty name).
    BadArg,
    /// Registry is full.
    Capacity,
    /// Requested lifecycle transition is a no-op.
    BadState,
}
