//! # Talos Kernel Core
//!
//! The orchestrator that owns the task registry and the system state and
//! runs the two concurrent loops:
//!
//! - the **scheduler loop**, ticking the scheduler every
//!   `SCHEDULER_PERIOD_MS`
//! - the **fault monitor loop**, scanning watchdogs and injected faults
//!   every `VOTING_PERIOD_MS`, keeping the health classification current,
//!   and periodically verifying the ML model integrity
//!
//! Both loops publish their outputs into the memory matrix, which acts as
//! the inter-subsystem bus. Shutdown is cooperative: `stop` clears the
//! running flag, each loop observes it at the top of its iteration, and
//! the kernel joins both with an unbounded wait.

#![warn(missing_docs)]

pub mod kernel;
pub mod wire;

pub use kernel::Kernel;

use talos_execution::ExecError;

/// Kernel result type.
pub type KernelResult<T> = Result<T, KernelError>;

/// Kernel errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A background loop could not be spawned. Fatal at startup.
    Spawn,
    /// A task operation was rejected by the registry.
    Task(ExecError),
}

impl From<ExecError> for KernelError {
    fn from(err: ExecError) -> Self {
        Self::Task(err)
    }
}
