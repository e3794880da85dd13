//! # Fault Monitor
//!
//! Per-task watchdog timers, injection slots for testing, the detection
//! scan, and the per-class recovery actions.

use crate::{FaultError, FaultKind, FaultReport, FaultResult};
use talos_config::MAX_TASKS;
use talos_execution::{Task, TaskId, TaskRegistry};

use spin::Mutex;
use std::time::Instant;

/// Per-task fault bookkeeping.
///
/// Each slot has its own lock: the injection entry point (driver thread)
/// publishes with release semantics, the monitor loop observes with
/// acquire semantics, and neither blocks the other tasks' slots.
#[derive(Debug, Clone, Copy, Default)]
struct FaultSlot {
    /// Pending injected fault, with its faulting address.
    injected: Option<(FaultKind, u32)>,
    /// Watchdog timeout in milliseconds; 0 means disarmed.
    watchdog_timeout_ms: u32,
    /// Absolute watchdog deadline, in monotonic milliseconds.
    watchdog_deadline_ms: u64,
    /// Number of recovery actions taken for this task.
    recoveries: u32,
}

/// The fault detector and recovery engine.
pub struct FaultMonitor {
    slots: [Mutex<FaultSlot>; MAX_TASKS],
    origin: Instant,
}

impl FaultMonitor {
    /// Create a monitor with all watchdogs disarmed and no pending faults.
    pub fn new() -> Self {
        log::info!("[fault] monitor initialized ({} slots)", MAX_TASKS);
        Self {
            slots: core::array::from_fn(|_| Mutex::new(FaultSlot::default())),
            origin: Instant::now(),
        }
    }

    /// Monotonic milliseconds since the monitor was created.
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Arm (or disarm, with `timeout_ms == 0`) a task's watchdog.
    pub fn set_watchdog(&self, id: TaskId, timeout_ms: u32) -> FaultResult<()> {
        let slot = self.slot(id)?;
        let mut slot = slot.lock();
        slot.watchdog_timeout_ms = timeout_ms;
        slot.watchdog_deadline_ms = if timeout_ms == 0 {
            0
        } else {
            self.now_ms() + u64::from(timeout_ms)
        };

        if timeout_ms == 0 {
            log::debug!("[fault] watchdog disarmed for task {}", id);
        } else {
            log::debug!("[fault] watchdog set for task {}: {} ms", id, timeout_ms);
        }
        Ok(())
    }

    /// Queue a fault against a task; the next detection scan reports it.
    pub fn inject(&self, kind: FaultKind, id: TaskId, address: u32) -> FaultResult<()> {
        let slot = self.slot(id)?;
        slot.lock().injected = Some((kind, address));
        log::warn!("[fault] injected {:?} fault for task {}", kind, id);
        Ok(())
    }

    /// Scan all monitored tasks and return the first fault found.
    ///
    /// Tasks are visited in ascending id order; for each, the watchdog is
    /// checked before the injection slot. The scan returns on the first
    /// hit, so lower ids shadow higher ones until they are recovered.
    pub fn check_system(&self, registry: &TaskRegistry) -> Option<FaultReport> {
        let tasks = registry.snapshot();
        self.check_at(&tasks, self.now_ms())
    }

    /// Detection scan against an explicit task snapshot and clock reading.
    pub fn check_at(&self, tasks: &[Task], now_ms: u64) -> Option<FaultReport> {
        for task in tasks {
            let Some(slot) = self.slots.get(task.id.index()) else {
                continue;
            };
            let slot = slot.lock();

            if task.active && slot.watchdog_timeout_ms > 0 && now_ms > slot.watchdog_deadline_ms {
                log::error!(
                    "[fault] FAULT DETECTED: watchdog timeout for task '{}'",
                    task.name
                );
                return Some(FaultReport {
                    kind: FaultKind::Timing,
                    task: task.id,
                    address: 0,
                    at_ms: now_ms,
                });
            }

            if let Some((kind, address)) = slot.injected {
                log::error!(
                    "[fault] FAULT DETECTED: injected {:?} fault for task '{}'",
                    kind,
                    task.name
                );
                return Some(FaultReport {
                    kind,
                    task: task.id,
                    address,
                    at_ms: now_ms,
                });
            }
        }

        None
    }

    /// Apply the recovery action for a detected fault.
    ///
    /// Every class increments the task's recovery counter and clears any
    /// pending injected fault. Timing recovery re-arms the watchdog with
    /// twice the task's deadline.
    pub fn recover(&self, report: &FaultReport, registry: &TaskRegistry) -> FaultResult<()> {
        let name = registry
            .with_task(report.task, |task| task.name)
            .map_err(|_| FaultError::BadArg)?;

        log::warn!(
            "[fault] executing {:?} recovery for task '{}'",
            report.kind,
            name
        );

        match report.kind {
            FaultKind::Timing => {
                let deadline_ms = registry
                    .with_task(report.task, |task| task.deadline_ms)
                    .map_err(|_| FaultError::BadArg)?;
                // Extended deadline for the re-execution window.
                self.set_watchdog(report.task, deadline_ms.saturating_mul(2))?;
            }
            FaultKind::Memory => {
                log::info!("[fault] restoring task state from backup");
            }
            FaultKind::Computation => {
                log::info!("[fault] scheduling task re-execution");
            }
            FaultKind::Communication => {
                log::info!("[fault] resetting communication channels");
            }
            FaultKind::Power => {
                log::info!("[fault] switching to low-power mode");
            }
        }

        let slot = self.slot(report.task)?;
        let mut slot = slot.lock();
        slot.recoveries += 1;
        slot.injected = None;
        Ok(())
    }

    /// Priority boost for tasks that needed recovery, in `[1.0, 2.0]`.
    ///
    /// Grows by 0.2 per recovery and saturates at 2.0; tasks with no
    /// recovery history (or an out-of-range id) get the neutral 1.0.
    pub fn recovery_factor(&self, id: TaskId) -> f32 {
        let Some(slot) = self.slots.get(id.index()) else {
            return 1.0;
        };
        let recoveries = slot.lock().recoveries;
        (1.0 + 0.2 * recoveries as f32).min(2.0)
    }

    fn slot(&self, id: TaskId) -> FaultResult<&Mutex<FaultSlot>> {
        self.slots.get(id.index()).ok_or(FaultError::BadArg)
    }
}

impl Default for FaultMonitor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
