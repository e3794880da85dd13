//! # Talos Fault Subsystem
//!
//! Detects and recovers from five classes of fault:
//!
//! - **Timing**: a watchdog-protected task overran its deadline
//! - **Memory**: corruption of task state
//! - **Computation**: a wrong or failed computation
//! - **Communication**: a broken inter-task channel
//! - **Power**: the power budget was exceeded
//!
//! The monitor scans the watchdog table and the injection slots every
//! voting period, returns the first fault it finds (ascending task id —
//! the ordering bias is deliberate), and applies a per-class recovery
//! action. Recovered tasks earn a priority boost through the recovery
//! factor consumed by the ML priority engine.

#![warn(missing_docs)]

pub mod monitor;
pub mod tmr;

pub use monitor::FaultMonitor;
pub use tmr::{tmr_vote, TMR_NO_MAJORITY};

use talos_execution::TaskId;

/// Fault subsystem result type.
pub type FaultResult<T> = Result<T, FaultError>;

/// Fault subsystem errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    /// Task id outside the monitored range.
    BadArg,
}

// =============================================================================
// Fault Classification
// =============================================================================

/// The five detectable fault classes.
///
/// "No fault" is represented by the absence of a [`FaultReport`], not by a
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Deadline overrun caught by a watchdog.
    Timing,
    /// Task state corruption.
    Memory,
    /// Wrong or failed computation.
    Computation,
    /// Broken communication channel.
    Communication,
    /// Power budget exceeded.
    Power,
}

impl FaultKind {
    /// Decode the wire representation (1..=5; 0 means "no fault").
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Timing),
            2 => Some(Self::Memory),
            3 => Some(Self::Computation),
            4 => Some(Self::Communication),
            5 => Some(Self::Power),
            _ => None,
        }
    }

    /// Wire representation (1..=5).
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Timing => 1,
            Self::Memory => 2,
            Self::Computation => 3,
            Self::Communication => 4,
            Self::Power => 5,
        }
    }
}

// =============================================================================
// Detection Result
// =============================================================================

/// A detected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultReport {
    /// Fault classification.
    pub kind: FaultKind,
    /// The affected task.
    pub task: TaskId,
    /// Faulting address, when the class carries one (0 otherwise).
    pub address: u32,
    /// Detection time, in monotonic milliseconds since monitor start.
    pub at_ms: u64,
}

// =============================================================================
// Tests
// =============================================================================
