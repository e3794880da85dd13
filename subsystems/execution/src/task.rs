//! # Task Descriptors
//!
//! A task is a periodic unit of work with a deadline, a criticality level,
//! and a rolling execution-time history consumed by the ML priority engine.

use crate::{ExecError, ExecResult};
use talos_config::Criticality;

use arrayvec::ArrayString;
use core::fmt;
use std::sync::Arc;

/// Maximum length of a task name, in bytes.
pub const MAX_NAME_LEN: usize = 31;

/// Length of the rolling execution-time history.
pub const HISTORY_LEN: usize = 10;

/// Unique identifier for tasks.
///
/// Equal to the task's slot index in the registry; ids are assigned at
/// registration and never reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TaskId(u32);

impl TaskId {
    /// Create an id from a raw slot index.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the registry slot index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A task's entry point: a runnable capability whose captured environment
/// plays the role of the opaque argument handle.
pub type TaskEntry = Arc<dyn Fn() + Send + Sync>;

/// A periodic task descriptor.
#[derive(Clone)]
pub struct Task {
    /// Stable identifier, equal to the registry slot index.
    pub id: TaskId,
    /// Human-readable name (truncated to [`MAX_NAME_LEN`] bytes).
    pub name: ArrayString<MAX_NAME_LEN>,
    /// Entry point invoked on a (simulated) execution step.
    pub entry: TaskEntry,
    /// Release period in milliseconds.
    pub period_ms: u32,
    /// Relative deadline in milliseconds.
    pub deadline_ms: u32,
    /// Estimated execution time in milliseconds.
    pub execution_time_ms: u32,
    /// Base priority in `0..MAX_PRIORITY_LEVELS`.
    pub base_priority: u32,
    /// Last computed dynamic priority, in `[0, 1]`.
    pub dynamic_priority: f32,
    /// Design assurance level.
    pub criticality: Criticality,
    /// Rolling execution-time history, most recent first (milliseconds).
    pub execution_history: [f32; HISTORY_LEN],
    /// Last observed execution time in milliseconds.
    pub last_execution_ms: u32,
    /// Number of missed deadlines observed so far.
    pub missed_deadlines: u32,
    /// Core the task is pinned to.
    pub core_affinity: u8,
    /// Whether the task is eligible for scheduling.
    pub active: bool,
}

impl Task {
    /// Build a descriptor ready for registration.
    ///
    /// The execution time is estimated as a tenth of the period and seeds
    /// the whole history; the id is assigned by the registry.
    pub fn new(
        name: &str,
        entry: TaskEntry,
        period_ms: u32,
        deadline_ms: u32,
        criticality: Criticality,
    ) -> ExecResult<Self> {
        if name.is_empty() {
            return Err(ExecError::BadArg);
        }

        let mut truncated = ArrayString::new();
        for ch in name.chars() {
            if truncated.try_push(ch).is_err() {
                break;
            }
        }

        let execution_time_ms = period_ms / 10;
        Ok(Self {
            id: TaskId::default(),
            name: truncated,
            entry,
            period_ms,
            deadline_ms,
            execution_time_ms,
            base_priority: 8,
            dynamic_priority: 0.0,
            criticality,
            execution_history: [execution_time_ms as f32; HISTORY_LEN],
            last_execution_ms: 0,
            missed_deadlines: 0,
            core_affinity: 0,
            active: true,
        })
    }

    /// Shift the history right and record the last observed execution time
    /// at index 0.
    pub fn record_history(&mut self) {
        for i in (1..HISTORY_LEN).rev() {
            self.execution_history[i] = self.execution_history[i - 1];
        }
        self.execution_history[0] = self.last_execution_ms as f32;
    }

    /// Mean of the execution-time history.
    pub fn history_mean(&self) -> f32 {
        self.execution_history.iter().sum::<f32>() / HISTORY_LEN as f32
    }

    /// Population variance of the execution-time history.
    pub fn history_variance(&self) -> f32 {
        let mean = self.history_mean();
        self.execution_history
            .iter()
            .map(|x| (x - mean) * (x - mean))
            .sum::<f32>()
            / HISTORY_LEN as f32
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name.as_str())
            .field("period_ms", &self.period_ms)
            .field("deadline_ms", &self.deadline_ms)
            .field("criticality", &self.criticality)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TaskEntry {
        Arc::new(|| {})
    }

    #[test]
    fn execution_time_is_tenth_of_period() {
        let t = Task::new("A", noop(), 200, 180, Criticality::DalB).unwrap();
        assert_eq!(t.execution_time_ms, 20);
        assert!(t.execution_history.iter().all(|&x| x == 20.0));
    }

    #[test]
    fn name_is_truncated_not_rejected() {
        let long = "x".repeat(64);
        let t = Task::new(&long, noop(), 100, 100, Criticality::DalD).unwrap();
        assert_eq!(t.name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(
            Task::new("", noop(), 100, 100, Criticality::DalD).unwrap_err(),
            ExecError::BadArg
        );
    }

    #[test]
    fn history_shifts_right() {
        let mut t = Task::new("A", noop(), 100, 100, Criticality::DalA).unwrap();
        t.last_execution_ms = 7;
        t.record_history();
        assert_eq!(t.execution_history[0], 7.0);
        assert_eq!(t.execution_history[1], 10.0);

        t.last_execution_ms = 9;
        t.record_history();
        assert_eq!(t.execution_history[0], 9.0);
        assert_eq!(t.execution_history[1], 7.0);
    }

    #[test]
    fn history_statistics() {
        let mut t = Task::new("A", noop(), 100, 100, Criticality::DalA).unwrap();
        t.execution_history = [2.0; HISTORY_LEN];
        assert_eq!(t.history_mean(), 2.0);
        assert_eq!(t.history_variance(), 0.0);

        t.execution_history = [1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0, 3.0];
        assert_eq!(t.history_mean(), 2.0);
        assert_eq!(t.history_variance(), 1.0);
    }
}
