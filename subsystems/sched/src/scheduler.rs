//! # Scheduler Core
//!
//! The per-tick decision engine: policy dispatch, the simulated execution
//! step, and jitter accounting.

use crate::{policy, Policy, ScheduleDecision};

use talos_ai::PriorityEngine;
use talos_config::{SystemStateVector, SYSTEM_TICK_MS};
use talos_execution::{Task, TaskRegistry};
use talos_fault::FaultMonitor;

use core::sync::atomic::{AtomicU64, Ordering};
use spin::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// The scheduler.
///
/// Shared between the kernel's scheduler loop (which ticks it) and any
/// observer (the driver queries the last decision and jitter). The last
/// decision sits behind its own lock so readers never see a torn value;
/// the jitter accumulators are plain atomics.
pub struct Scheduler {
    policy: RwLock<Policy>,
    system_state: RwLock<SystemStateVector>,
    last_decision: RwLock<ScheduleDecision>,
    last_jitter_ns: AtomicU64,
    worst_jitter_ns: AtomicU64,
    runs: AtomicU64,
    engine: Arc<PriorityEngine>,
    faults: Arc<FaultMonitor>,
}

impl Scheduler {
    /// Create a scheduler with the default (ML-hybrid) policy.
    pub fn new(engine: Arc<PriorityEngine>, faults: Arc<FaultMonitor>) -> Self {
        let policy = Policy::default();
        log::info!("[sched] initializing scheduler with {} policy", policy.name());
        Self {
            policy: RwLock::new(policy),
            system_state: RwLock::new(SystemStateVector::default()),
            last_decision: RwLock::new(ScheduleDecision::default()),
            last_jitter_ns: AtomicU64::new(0),
            worst_jitter_ns: AtomicU64::new(0),
            runs: AtomicU64::new(0),
            engine,
            faults,
        }
    }

    /// Switch the scheduling policy by setting name.
    pub fn set_policy(&self, name: &str) {
        let policy = Policy::parse(name);
        *self.policy.write() = policy;
        log::info!("[sched] scheduler policy changed to {}", policy.name());
    }

    /// The active policy.
    pub fn policy(&self) -> Policy {
        *self.policy.read()
    }

    /// Install a fresh system-state snapshot for the ML policy.
    pub fn update_system_state(&self, sys: &SystemStateVector) {
        *self.system_state.write() = sys.clone();
    }

    /// The most recent decision.
    pub fn last_decision(&self) -> ScheduleDecision {
        *self.last_decision.read()
    }

    /// Duration of the most recent tick, in nanoseconds.
    pub fn last_jitter_ns(&self) -> u64 {
        self.last_jitter_ns.load(Ordering::Relaxed)
    }

    /// Worst tick duration observed over the process lifetime.
    pub fn worst_case_jitter_ns(&self) -> u64 {
        self.worst_jitter_ns.load(Ordering::Relaxed)
    }

    /// Number of ticks executed.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Dispatch the active policy over a task snapshot.
    ///
    /// This is the (simulated) hardware scheduling core: on the real
    /// target it would be an FPGA offload, here it is a function call.
    /// Returns the decision and, for the hybrid policy, the winning score.
    pub fn decide(&self, tasks: &[Task]) -> (ScheduleDecision, Option<f32>) {
        match self.policy() {
            Policy::Rms => (policy::rate_monotonic(tasks), None),
            Policy::Edf => (policy::earliest_deadline(tasks), None),
            Policy::MlHybrid => {
                let sys = self.system_state.read().clone();
                let (decision, score) = policy::ml_hybrid(tasks, &sys, &self.engine, &self.faults);
                (decision, Some(score))
            }
        }
    }

    /// Run one scheduling tick.
    ///
    /// Samples the clock, dispatches the policy, records the decision,
    /// performs the simulated execution step for the selected task, and
    /// updates the jitter accumulators. The wall-clock duration of the
    /// whole tick (including the simulated execution) is the jitter
    /// sample.
    pub fn tick(&self, registry: &TaskRegistry) -> ScheduleDecision {
        let t0 = Instant::now();

        let tasks = registry.snapshot();
        let (decision, score) = self.decide(&tasks);
        *self.last_decision.write() = decision;

        // The zero decision aliases task 0; the registry is the authority
        // on whether the slot is actually runnable.
        if registry.is_ready(decision.task) {
            self.execute_step(registry, decision, score);
        }

        let elapsed_ns = t0.elapsed().as_nanos() as u64;
        self.last_jitter_ns.store(elapsed_ns, Ordering::Relaxed);
        self.worst_jitter_ns.fetch_max(elapsed_ns, Ordering::Relaxed);
        self.runs.fetch_add(1, Ordering::Relaxed);

        decision
    }

    /// Simulated execution of the selected task: roll the execution
    /// history forward, invoke the entry point, and observe its runtime.
    fn execute_step(&self, registry: &TaskRegistry, decision: ScheduleDecision, score: Option<f32>) {
        let entry = registry.with_task_mut(decision.task, |task| {
            task.record_history();
            if let Some(score) = score {
                task.dynamic_priority = score;
            }
            log::debug!(
                "[sched] executing task '{}' (id {}) on core {} for {} ms",
                task.name,
                task.id,
                decision.core,
                decision.slice_ms
            );
            task.entry.clone()
        });

        let Ok(entry) = entry else {
            return;
        };

        // Run the entry outside the slot lock; it may log or touch other
        // subsystems.
        let started = Instant::now();
        entry();
        std::thread::sleep(std::time::Duration::from_millis(SYSTEM_TICK_MS));
        let ran_ms = started.elapsed().as_millis() as u32;

        let _ = registry.with_task_mut(decision.task, |task| {
            task.last_execution_ms = ran_ms;
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use talos_config::Criticality;
    use talos_execution::{TaskEntry, TaskId};

    fn noop() -> TaskEntry {
        Arc::new(|| {})
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(
            Arc::new(PriorityEngine::with_seed(23)),
            Arc::new(FaultMonitor::new()),
        )
    }

    fn registry() -> TaskRegistry {
        let reg = TaskRegistry::new();
        reg.create("SafetyCritical", noop(), 100, 100, Criticality::DalA)
            .unwrap();
        reg.create("Control", noop(), 200, 180, Criticality::DalB)
            .unwrap();
        reg.create("Monitoring", noop(), 500, 450, Criticality::DalC)
            .unwrap();
        reg
    }

    #[test]
    fn tick_records_the_decision() {
        let sched = scheduler();
        let reg = registry();
        sched.set_policy("RMS");

        let decision = sched.tick(&reg);
        assert_eq!(decision.task, TaskId::from_raw(0));
        assert_eq!(sched.last_decision(), decision);
        assert_eq!(sched.runs(), 1);
    }

    #[test]
    fn policy_switch_changes_the_selection() {
        let sched = scheduler();
        let reg = registry();

        sched.set_policy("EDF");
        reg.suspend(TaskId::from_raw(0)).unwrap();
        let decision = sched.tick(&reg);
        // Deadlines 180 and 450 remain; 180 wins.
        assert_eq!(decision.task, TaskId::from_raw(1));
    }

    #[test]
    fn worst_case_jitter_is_monotone() {
        let sched = scheduler();
        let reg = registry();

        let mut previous_worst = 0;
        for _ in 0..5 {
            sched.tick(&reg);
            let worst = sched.worst_case_jitter_ns();
            assert!(worst >= previous_worst);
            assert!(worst >= sched.last_jitter_ns());
            previous_worst = worst;
        }
        assert!(previous_worst > 0);
    }

    #[test]
    fn execution_step_rolls_the_history() {
        let sched = scheduler();
        let reg = registry();
        sched.set_policy("RMS");

        sched.tick(&reg);
        sched.tick(&reg);

        let id = TaskId::from_raw(0);
        let (history_head, last_ms) = reg
            .with_task(id, |t| (t.execution_history[0], t.last_execution_ms))
            .unwrap();
        // The second tick recorded the first tick's observed runtime.
        assert!(last_ms >= 1);
        assert!(history_head >= 1.0);
    }

    #[test]
    fn empty_registry_yields_zero_decision_and_no_execution() {
        let sched = scheduler();
        let reg = TaskRegistry::new();

        let decision = sched.tick(&reg);
        assert_eq!(decision, ScheduleDecision::default());
        assert_eq!(sched.last_decision(), ScheduleDecision::default());
    }

    #[test]
    fn hybrid_tick_publishes_the_winning_score() {
        let sched = scheduler();
        let reg = registry();

        let decision = sched.tick(&reg);
        let published = reg
            .with_task(decision.task, |t| t.dynamic_priority)
            .unwrap();
        assert!((0.0..=1.0).contains(&published));
        assert!(published > 0.0);
    }
}
