//! # Task Registry
//!
//! Fixed-capacity slot table for task descriptors. Each slot has its own
//! lock, so the scheduler and fault monitor can touch different tasks
//! without contending; registration is single-writer by contract.

use crate::{ExecError, ExecResult, Task, TaskEntry, TaskId};
use talos_config::{Criticality, MAX_PRIORITY_LEVELS, MAX_TASKS};

use core::sync::atomic::{AtomicUsize, Ordering};
use spin::RwLock;

/// The task registry.
///
/// Slots are handed out in ascending order and never reclaimed; a deleted
/// task keeps its slot, marked inactive.
pub struct TaskRegistry {
    slots: [RwLock<Option<Task>>; MAX_TASKS],
    count: AtomicUsize,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| RwLock::new(None)),
            count: AtomicUsize::new(0),
        }
    }

    /// Register a task and return its id (equal to the slot index).
    ///
    /// Fails with [`ExecError::Capacity`] once all `MAX_TASKS` slots have
    /// been handed out.
    pub fn create(
        &self,
        name: &str,
        entry: TaskEntry,
        period_ms: u32,
        deadline_ms: u32,
        criticality: Criticality,
    ) -> ExecResult<TaskId> {
        let mut task = Task::new(name, entry, period_ms, deadline_ms, criticality)?;

        let index = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < MAX_TASKS).then_some(n + 1)
            })
            .map_err(|_| ExecError::Capacity)?;

        let id = TaskId::from_raw(index as u32);
        task.id = id;
        *self.slots[index].write() = Some(task);

        log::info!("[registry] task '{}' created with id {}", name, id);
        Ok(id)
    }

    /// Mark a task inactive. Its slot and id are not reclaimed.
    pub fn remove(&self, id: TaskId) -> ExecResult<()> {
        self.with_task_mut(id, |task| {
            task.active = false;
            log::info!("[registry] task '{}' (id {}) deleted", task.name, id);
        })
    }

    /// Change a task's base priority.
    pub fn set_priority(&self, id: TaskId, priority: u32) -> ExecResult<()> {
        if priority >= MAX_PRIORITY_LEVELS {
            return Err(ExecError::BadArg);
        }
        self.with_task_mut(id, |task| {
            task.base_priority = priority;
            log::debug!("[registry] task '{}' priority set to {}", task.name, priority);
        })
    }

    /// Suspend an active task.
    ///
    /// Fails with [`ExecError::BadState`] when the task is already
    /// suspended.
    pub fn suspend(&self, id: TaskId) -> ExecResult<()> {
        self.with_task_mut(id, |task| {
            if !task.active {
                return Err(ExecError::BadState);
            }
            task.active = false;
            log::info!("[registry] task '{}' suspended", task.name);
            Ok(())
        })?
    }

    /// Resume a suspended task.
    ///
    /// Fails with [`ExecError::BadState`] when the task is already active.
    pub fn resume(&self, id: TaskId) -> ExecResult<()> {
        self.with_task_mut(id, |task| {
            if task.active {
                return Err(ExecError::BadState);
            }
            task.active = true;
            log::info!("[registry] task '{}' resumed", task.name);
            Ok(())
        })?
    }

    /// Whether the task exists and is eligible for scheduling.
    pub fn is_ready(&self, id: TaskId) -> bool {
        self.with_task(id, |task| task.active).unwrap_or(false)
    }

    /// Number of slots handed out so far.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether no tasks have been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered tasks currently active.
    pub fn active_count(&self) -> usize {
        (0..self.len())
            .filter(|&i| {
                self.slots[i]
                    .read()
                    .as_ref()
                    .is_some_and(|task| task.active)
            })
            .count()
    }

    /// Clone every registered descriptor, in id order.
    ///
    /// This is the read path for the scheduler and the fault monitor; the
    /// clones decouple policy evaluation from the per-slot locks.
    pub fn snapshot(&self) -> Vec<Task> {
        (0..self.len())
            .filter_map(|i| self.slots[i].read().clone())
            .collect()
    }

    /// Run `f` against a shared borrow of the task.
    pub fn with_task<R>(&self, id: TaskId, f: impl FnOnce(&Task) -> R) -> ExecResult<R> {
        let slot = self.slots.get(id.index()).ok_or(ExecError::BadArg)?;
        let guard = slot.read();
        let task = guard.as_ref().ok_or(ExecError::BadArg)?;
        Ok(f(task))
    }

    /// Run `f` against an exclusive borrow of the task.
    pub fn with_task_mut<R>(&self, id: TaskId, f: impl FnOnce(&mut Task) -> R) -> ExecResult<R> {
        let slot = self.slots.get(id.index()).ok_or(ExecError::BadArg)?;
        let mut guard = slot.write();
        let task = guard.as_mut().ok_or(ExecError::BadArg)?;
        Ok(f(task))
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn noop() -> TaskEntry {
        Arc::new(|| {})
    }

    #[test]
    fn ids_equal_insertion_index() {
        let reg = TaskRegistry::new();
        for i in 0..4 {
            let id = reg
                .create("T", noop(), 100, 100, Criticality::DalC)
                .unwrap();
            assert_eq!(id.index(), i);
        }
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn capacity_is_enforced() {
        let reg = TaskRegistry::new();
        for _ in 0..MAX_TASKS {
            reg.create("T", noop(), 100, 100, Criticality::DalD).unwrap();
        }
        assert_eq!(
            reg.create("T", noop(), 100, 100, Criticality::DalD)
                .unwrap_err(),
            ExecError::Capacity
        );
    }

    #[test]
    fn suspend_resume_transitions() {
        let reg = TaskRegistry::new();
        let id = reg.create("T", noop(), 100, 100, Criticality::DalC).unwrap();

        assert!(reg.is_ready(id));
        reg.suspend(id).unwrap();
        assert!(!reg.is_ready(id));
        assert_eq!(reg.suspend(id).unwrap_err(), ExecError::BadState);

        reg.resume(id).unwrap();
        assert!(reg.is_ready(id));
        assert_eq!(reg.resume(id).unwrap_err(), ExecError::BadState);
    }

    #[test]
    fn remove_keeps_the_slot() {
        let reg = TaskRegistry::new();
        let a = reg.create("A", noop(), 100, 100, Criticality::DalC).unwrap();
        reg.remove(a).unwrap();

        assert!(!reg.is_ready(a));
        assert_eq!(reg.len(), 1);

        // The next id continues after the deleted slot.
        let b = reg.create("B", noop(), 100, 100, Criticality::DalC).unwrap();
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn priority_bounds_are_checked() {
        let reg = TaskRegistry::new();
        let id = reg.create("T", noop(), 100, 100, Criticality::DalC).unwrap();

        reg.set_priority(id, MAX_PRIORITY_LEVELS - 1).unwrap();
        assert_eq!(
            reg.set_priority(id, MAX_PRIORITY_LEVELS).unwrap_err(),
            ExecError::BadArg
        );
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let reg = TaskRegistry::new();
        assert_eq!(
            reg.suspend(TaskId::from_raw(5)).unwrap_err(),
            ExecError::BadArg
        );
        assert!(!reg.is_ready(TaskId::from_raw(99)));
    }

    #[test]
    fn snapshot_preserves_id_order() {
        let reg = TaskRegistry::new();
        reg.create("A", noop(), 100, 100, Criticality::DalA).unwrap();
        reg.create("B", noop(), 200, 180, Criticality::DalB).unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].name.as_str(), "A");
        assert_eq!(snap[1].name.as_str(), "B");
    }

    #[test]
    fn active_count_tracks_lifecycle() {
        let reg = TaskRegistry::new();
        let a = reg.create("A", noop(), 100, 100, Criticality::DalA).unwrap();
        reg.create("B", noop(), 200, 180, Criticality::DalB).unwrap();
        assert_eq!(reg.active_count(), 2);

        reg.suspend(a).unwrap();
        assert_eq!(reg.active_count(), 1);
    }
}
