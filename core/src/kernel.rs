//! # Kernel Orchestrator
//!
//! Owns every subsystem, hands read-only snapshots across them, and runs
//! the scheduler and fault monitor loops on background threads.

use crate::{wire, KernelError, KernelResult};

use talos_ai::PriorityEngine;
use talos_config::{
    Criticality, SystemHealth, SystemStateVector, SCHEDULER_PERIOD_MS, VOTING_PERIOD_MS,
};
use talos_execution::{TaskEntry, TaskId, TaskRegistry};
use talos_fault::FaultMonitor;
use talos_memory::{MemoryMatrix, Region};
use talos_sched::Scheduler;

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Monitor iterations between ML model integrity checks (~500 ms).
const INTEGRITY_CHECK_INTERVAL: u64 = 50;

/// CPU load above which the system is classified degraded.
const DEGRADED_CPU_LOAD: f32 = 0.85;

/// Temperature above which the system is classified degraded.
const DEGRADED_TEMPERATURE_C: f32 = 70.0;

/// The kernel orchestrator.
pub struct Kernel {
    registry: Arc<TaskRegistry>,
    system_state: Arc<RwLock<SystemStateVector>>,
    matrix: Arc<MemoryMatrix>,
    faults: Arc<FaultMonitor>,
    engine: Arc<PriorityEngine>,
    scheduler: Arc<Scheduler>,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Kernel {
    /// Initialise every subsystem and assemble the kernel.
    pub fn new() -> Self {
        log::info!("[kernel] initializing memory matrix");
        let matrix = Arc::new(MemoryMatrix::new());
        matrix.init();

        log::info!("[kernel] initializing fault tolerance");
        let faults = Arc::new(FaultMonitor::new());

        log::info!("[kernel] initializing ML engine");
        let engine = Arc::new(PriorityEngine::new());

        log::info!("[kernel] initializing scheduler");
        let scheduler = Arc::new(Scheduler::new(engine.clone(), faults.clone()));

        log::info!("[kernel] kernel initialized");
        Self {
            registry: Arc::new(TaskRegistry::new()),
            system_state: Arc::new(RwLock::new(SystemStateVector::default())),
            matrix,
            faults,
            engine,
            scheduler,
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the scheduler and fault monitor loops.
    ///
    /// Fails with [`KernelError::Spawn`] when a loop thread cannot be
    /// created; this is the only fatal startup error. Calling `start` on
    /// a running kernel is a no-op.
    pub fn start(&self) -> KernelResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let sched_worker = {
            let running = self.running.clone();
            let scheduler = self.scheduler.clone();
            let registry = self.registry.clone();
            let matrix = self.matrix.clone();
            let ticks = self.ticks.clone();
            thread::Builder::new()
                .name("talos-sched".into())
                .spawn(move || scheduler_loop(&running, &scheduler, &registry, &matrix, &ticks))
        };
        let sched_worker = match sched_worker {
            Ok(handle) => handle,
            Err(err) => {
                log::error!("[kernel] failed to spawn scheduler loop: {err}");
                self.running.store(false, Ordering::Release);
                return Err(KernelError::Spawn);
            }
        };

        let monitor_worker = {
            let running = self.running.clone();
            let faults = self.faults.clone();
            let registry = self.registry.clone();
            let matrix = self.matrix.clone();
            let system_state = self.system_state.clone();
            let scheduler = self.scheduler.clone();
            let engine = self.engine.clone();
            thread::Builder::new().name("talos-fault".into()).spawn(move || {
                monitor_loop(
                    &running,
                    &faults,
                    &registry,
                    &matrix,
                    &system_state,
                    &scheduler,
                    &engine,
                )
            })
        };
        let monitor_worker = match monitor_worker {
            Ok(handle) => handle,
            Err(err) => {
                log::error!("[kernel] failed to spawn fault monitor loop: {err}");
                self.running.store(false, Ordering::Release);
                let _ = sched_worker.join();
                return Err(KernelError::Spawn);
            }
        };

        let mut workers = self.workers.lock();
        workers.push(sched_worker);
        workers.push(monitor_worker);

        log::info!("[kernel] kernel started");
        Ok(())
    }

    /// Stop both loops and release the memory matrix.
    ///
    /// Cancellation is cooperative: each loop observes the cleared flag at
    /// the top of its next iteration. The join is unbounded.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        for worker in self.workers.lock().drain(..) {
            let _ = worker.join();
        }

        self.matrix.shutdown();
        log::info!("[kernel] kernel stopped");
    }

    /// Whether the loops are running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Register a task.
    ///
    /// DAL-A and DAL-B tasks get a watchdog armed with their relative
    /// deadline; every registration refreshes the active-task count and
    /// the descriptor table published on the bus.
    pub fn add_task(
        &self,
        name: &str,
        entry: TaskEntry,
        period_ms: u32,
        deadline_ms: u32,
        criticality: Criticality,
    ) -> KernelResult<TaskId> {
        let id = self
            .registry
            .create(name, entry, period_ms, deadline_ms, criticality)?;

        if criticality.is_safety_relevant() {
            let _ = self.faults.set_watchdog(id, deadline_ms);
        }

        {
            let mut sys = self.system_state.write();
            sys.active_tasks = self.registry.active_count() as u32;
            self.scheduler.update_system_state(&sys);
        }
        let _ = self.matrix.write(
            Region::TaskDescriptors,
            &wire::encode_task_summaries(&self.registry.snapshot()),
        );

        Ok(id)
    }

    /// Snapshot of every registered task, in id order.
    pub fn tasks(&self) -> Vec<talos_execution::Task> {
        self.registry.snapshot()
    }

    /// Current system state.
    pub fn system_state(&self) -> SystemStateVector {
        self.system_state.read().clone()
    }

    /// Mirror fresh load figures into the system state and notify the
    /// scheduler.
    pub fn update_load(&self, cpu_load: f32, memory_usage: f32) {
        let snapshot = {
            let mut sys = self.system_state.write();
            sys.cpu_load = cpu_load;
            sys.memory_usage = memory_usage;
            sys.clone()
        };
        self.scheduler.update_system_state(&snapshot);
        let _ = self
            .matrix
            .write(Region::SystemState, &wire::encode_system_state(&snapshot));
    }

    /// Mirror fresh thermal and power figures into the system state.
    pub fn update_environment(&self, temperature: f32, power_draw: f32) {
        let snapshot = {
            let mut sys = self.system_state.write();
            sys.temperature = temperature;
            sys.power_draw = power_draw;
            sys.clone()
        };
        self.scheduler.update_system_state(&snapshot);
    }

    /// Number of scheduler ticks since start.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// The task registry.
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// The fault monitor (injection entry point for the driver).
    pub fn fault_monitor(&self) -> &Arc<FaultMonitor> {
        &self.faults
    }

    /// The scheduler (policy setting and jitter statistics).
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// The memory matrix.
    pub fn memory(&self) -> &Arc<MemoryMatrix> {
        &self.matrix
    }

    /// The ML priority engine.
    pub fn priority_engine(&self) -> &Arc<PriorityEngine> {
        &self.engine
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Loop Bodies
// =============================================================================

fn scheduler_loop(
    running: &AtomicBool,
    scheduler: &Scheduler,
    registry: &TaskRegistry,
    matrix: &MemoryMatrix,
    ticks: &AtomicU64,
) {
    log::debug!("[kernel] scheduler loop running");
    while running.load(Ordering::Acquire) {
        let decision = scheduler.tick(registry);
        let _ = matrix.write(
            Region::SchedulerDecisions,
            &wire::encode_decision(&decision),
        );
        ticks.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(SCHEDULER_PERIOD_MS));
    }
    log::debug!("[kernel] scheduler loop exited");
}

fn monitor_loop(
    running: &AtomicBool,
    faults: &FaultMonitor,
    registry: &TaskRegistry,
    matrix: &MemoryMatrix,
    system_state: &RwLock<SystemStateVector>,
    scheduler: &Scheduler,
    engine: &PriorityEngine,
) {
    log::debug!("[kernel] fault monitor loop running");
    let mut iterations: u64 = 0;

    while running.load(Ordering::Acquire) {
        if let Some(report) = faults.check_system(registry) {
            let _ = matrix.write(Region::FaultReports, &wire::encode_fault_report(&report));
            let _ = faults.recover(&report, registry);
        }

        {
            let mut sys = system_state.write();
            let health = if sys.cpu_load > DEGRADED_CPU_LOAD
                || sys.temperature > DEGRADED_TEMPERATURE_C
            {
                SystemHealth::Degraded
            } else {
                SystemHealth::Normal
            };
            if health != sys.health {
                log::warn!(
                    "[kernel] system health {} -> {} (load {:.2}, temp {:.1} C)",
                    sys.health.name(),
                    health.name(),
                    sys.cpu_load,
                    sys.temperature
                );
                sys.health = health;
            }
            sys.active_tasks = registry.active_count() as u32;
            scheduler.update_system_state(&sys);
            let _ = matrix.write(Region::SystemState, &wire::encode_system_state(&sys));
        }

        iterations += 1;
        if iterations % INTEGRITY_CHECK_INTERVAL == 0 {
            let _ = engine.integrity_check(faults);
        }

        thread::sleep(Duration::from_millis(VOTING_PERIOD_MS));
    }
    log::debug!("[kernel] fault monitor loop exited");
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use talos_fault::FaultKind;
    use talos_sched::ScheduleDecision;

    fn noop() -> TaskEntry {
        Arc::new(|| {})
    }

    fn populated_kernel() -> Kernel {
        let kernel = Kernel::new();
        kernel
            .add_task("SafetyCritical", noop(), 100, 100, Criticality::DalA)
            .unwrap();
        kernel
            .add_task("Control", noop(), 200, 180, Criticality::DalB)
            .unwrap();
        kernel
            .add_task("Monitoring", noop(), 500, 450, Criticality::DalC)
            .unwrap();
        kernel
            .add_task("Background", noop(), 1000, 900, Criticality::DalD)
            .unwrap();
        kernel
    }

    #[test]
    fn task_ids_are_sequential() {
        let kernel = populated_kernel();
        let tasks = kernel.tasks();
        assert_eq!(tasks.len(), 4);
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.id.index(), i);
        }
        assert_eq!(kernel.system_state().active_tasks, 4);
    }

    #[test]
    fn safety_relevant_tasks_are_watchdog_protected() {
        let kernel = populated_kernel();

        // Let the DAL-A deadline (100 ms) lapse without any watchdog
        // resets; the DAL-C/D tasks have no watchdog to trip.
        thread::sleep(Duration::from_millis(220));

        let faults = kernel.fault_monitor();
        let report = faults
            .check_at(&kernel.tasks(), faults.now_ms())
            .expect("watchdog should have fired");
        assert_eq!(report.kind, FaultKind::Timing);
        assert_eq!(report.task, TaskId::from_raw(0));
    }

    #[test]
    fn update_load_reaches_state_and_bus() {
        let kernel = Kernel::new();
        kernel.update_load(0.9, 0.6);

        let sys = kernel.system_state();
        assert_eq!(sys.cpu_load, 0.9);
        assert_eq!(sys.memory_usage, 0.6);

        let mut buf = [0u8; wire::SYSTEM_STATE_LEN];
        kernel.memory().read(Region::SystemState, &mut buf).unwrap();
        let published = wire::decode_system_state(&buf);
        assert_eq!(published.cpu_load, 0.9);
    }

    #[test]
    fn loops_tick_and_shut_down_cleanly() {
        let kernel = populated_kernel();
        kernel.start().unwrap();
        assert!(kernel.is_running());

        // Starting twice is a no-op.
        kernel.start().unwrap();

        thread::sleep(Duration::from_millis(120));
        kernel.stop();
        assert!(!kernel.is_running());

        let ticks = kernel.tick_count();
        assert!(ticks > 0, "scheduler loop never ticked");

        // The last decision reached the bus before shutdown released the
        // matrix; after stop the matrix rejects transfers.
        assert!(kernel
            .memory()
            .read(Region::SchedulerDecisions, &mut [0u8; wire::DECISION_LEN])
            .is_err());
    }

    #[test]
    fn injected_fault_is_recovered_by_the_monitor_loop() {
        // Watchdog-free tasks keep the monitor focused on the injection.
        let kernel = Kernel::new();
        for name in ["A", "B", "C"] {
            kernel
                .add_task(name, noop(), 500, 450, Criticality::DalC)
                .unwrap();
        }
        kernel.start().unwrap();

        let id = TaskId::from_raw(2);
        kernel
            .fault_monitor()
            .inject(FaultKind::Memory, id, 0x2000)
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        kernel.stop();

        // Recovery cleared the injection and bumped the factor.
        assert!(kernel.fault_monitor().recovery_factor(id) > 1.0);
        assert_eq!(
            kernel
                .fault_monitor()
                .check_at(&kernel.tasks(), kernel.fault_monitor().now_ms()),
            None
        );
    }

    #[test]
    fn health_degrades_under_load_and_recovers() {
        let kernel = Kernel::new();
        kernel.start().unwrap();

        kernel.update_load(0.95, 0.5);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(kernel.system_state().health, SystemHealth::Degraded);

        kernel.update_load(0.2, 0.3);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(kernel.system_state().health, SystemHealth::Normal);

        kernel.stop();
    }

    #[test]
    fn last_decision_is_published_while_running() {
        let kernel = populated_kernel();
        kernel.scheduler().set_policy("RMS");
        kernel.start().unwrap();
        thread::sleep(Duration::from_millis(80));

        let mut buf = [0u8; wire::DECISION_LEN];
        kernel
            .memory()
            .read(Region::SchedulerDecisions, &mut buf)
            .unwrap();
        let decision = wire::decode_decision(&buf);
        assert_ne!(decision, ScheduleDecision::default());
        assert_eq!(decision.task, TaskId::from_raw(0)); // shortest period

        kernel.stop();
    }
}
