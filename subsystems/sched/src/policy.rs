//! # Scheduling Policies
//!
//! Pure selection functions over a task snapshot. Strict comparisons make
//! the ascending-id tie-break fall out of the iteration order.

use crate::ScheduleDecision;

use talos_ai::PriorityEngine;
use talos_config::SystemStateVector;
use talos_execution::Task;
use talos_fault::FaultMonitor;

/// The active scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Rate monotonic scheduling.
    Rms,
    /// Earliest deadline first.
    Edf,
    /// ML-assisted hybrid scheduling.
    #[default]
    MlHybrid,
}

impl Policy {
    /// Parse a policy setting. Unrecognised names select the hybrid
    /// policy, matching the dispatch's catch-all arm.
    pub fn parse(name: &str) -> Self {
        match name {
            "RMS" => Self::Rms,
            "EDF" => Self::Edf,
            "ML_HYBRID" => Self::MlHybrid,
            other => {
                log::warn!("[sched] unknown policy '{other}', using ML_HYBRID");
                Self::MlHybrid
            }
        }
    }

    /// The policy's setting name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rms => "RMS",
            Self::Edf => "EDF",
            Self::MlHybrid => "ML_HYBRID",
        }
    }
}

fn decision_for(task: &Task) -> ScheduleDecision {
    ScheduleDecision {
        task: task.id,
        core: task.core_affinity,
        slice_ms: task.execution_time_ms,
    }
}

/// Rate monotonic selection: the active task with the shortest non-zero
/// period. Aperiodic tasks (period 0) are not eligible.
pub fn rate_monotonic(tasks: &[Task]) -> ScheduleDecision {
    let mut decision = ScheduleDecision::default();
    let mut best_period = u32::MAX;

    for task in tasks {
        if task.active && task.period_ms > 0 && task.period_ms < best_period {
            best_period = task.period_ms;
            decision = decision_for(task);
        }
    }

    decision
}

/// Earliest-deadline-first selection: the active task with the shortest
/// relative deadline.
pub fn earliest_deadline(tasks: &[Task]) -> ScheduleDecision {
    let mut decision = ScheduleDecision::default();
    let mut earliest = u32::MAX;

    for task in tasks {
        if task.active && task.deadline_ms < earliest {
            earliest = task.deadline_ms;
            decision = decision_for(task);
        }
    }

    decision
}

/// ML-hybrid selection: the active task with the highest dynamic
/// priority. Returns the decision together with the winning score so the
/// caller can publish it on the descriptor.
pub fn ml_hybrid(
    tasks: &[Task],
    sys: &SystemStateVector,
    engine: &PriorityEngine,
    faults: &FaultMonitor,
) -> (ScheduleDecision, f32) {
    let mut decision = ScheduleDecision::default();
    let mut best_score = -1.0f32;

    for task in tasks {
        if !task.active {
            continue;
        }
        let score = engine.dynamic_priority(task, sys, faults);
        if score > best_score {
            best_score = score;
            decision = decision_for(task);
        }
    }

    (decision, best_score.max(0.0))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use talos_config::Criticality;
    use talos_execution::{TaskEntry, TaskId, TaskRegistry};
    use talos_fault::FaultKind;

    fn noop() -> TaskEntry {
        Arc::new(|| {})
    }

    fn snapshot(specs: &[(u32, u32)]) -> Vec<Task> {
        let reg = TaskRegistry::new();
        for (period, deadline) in specs {
            reg.create("T", noop(), *period, *deadline, Criticality::DalC)
                .unwrap();
        }
        reg.snapshot()
    }

    #[test]
    fn rms_picks_the_shortest_period() {
        let tasks = snapshot(&[(100, 100), (200, 180), (50, 50)]);
        let decision = rate_monotonic(&tasks);
        assert_eq!(decision.task, TaskId::from_raw(2));
        assert_eq!(decision.slice_ms, 5);
    }

    #[test]
    fn rms_ignores_aperiodic_and_inactive_tasks() {
        let mut tasks = snapshot(&[(0, 100), (100, 100), (50, 50)]);
        tasks[2].active = false;
        let decision = rate_monotonic(&tasks);
        assert_eq!(decision.task, TaskId::from_raw(1));
    }

    #[test]
    fn rms_ties_break_towards_the_lower_id() {
        let tasks = snapshot(&[(100, 100), (100, 90)]);
        assert_eq!(rate_monotonic(&tasks).task, TaskId::from_raw(0));
    }

    #[test]
    fn edf_picks_the_shortest_deadline() {
        let tasks = snapshot(&[(200, 180), (100, 90), (500, 450)]);
        let decision = earliest_deadline(&tasks);
        assert_eq!(decision.task, TaskId::from_raw(1));
    }

    #[test]
    fn empty_snapshot_yields_the_zero_decision() {
        assert_eq!(rate_monotonic(&[]), ScheduleDecision::default());
        assert_eq!(earliest_deadline(&[]), ScheduleDecision::default());
    }

    #[test]
    fn ml_hybrid_prefers_the_recovery_boosted_task() {
        // Millisecond-scale timing features saturate the sigmoid, so both
        // tasks predict urgency 1.0 and the recovery factor decides.
        let reg = TaskRegistry::new();
        reg.create("A", noop(), 100, 100, Criticality::DalC).unwrap();
        reg.create("B", noop(), 100, 100, Criticality::DalC).unwrap();

        let engine = PriorityEngine::with_seed(17);
        let faults = FaultMonitor::new();
        faults
            .inject(FaultKind::Computation, TaskId::from_raw(1), 0)
            .unwrap();
        let report = faults.check_system(&reg).unwrap();
        faults.recover(&report, &reg).unwrap();

        let sys = SystemStateVector::default();
        let (decision, score) = ml_hybrid(&reg.snapshot(), &sys, &engine, &faults);
        assert_eq!(decision.task, TaskId::from_raw(1));
        assert!(score > 0.0);
    }

    #[test]
    fn ml_hybrid_with_no_eligible_task_scores_zero() {
        let engine = PriorityEngine::with_seed(17);
        let faults = FaultMonitor::new();
        let sys = SystemStateVector::default();

        let (decision, score) = ml_hybrid(&[], &sys, &engine, &faults);
        assert_eq!(decision, ScheduleDecision::default());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn policy_parsing_defaults_to_hybrid() {
        assert_eq!(Policy::parse("RMS"), Policy::Rms);
        assert_eq!(Policy::parse("EDF"), Policy::Edf);
        assert_eq!(Policy::parse("ML_HYBRID"), Policy::MlHybrid);
        assert_eq!(Policy::parse("round-robin"), Policy::MlHybrid);
    }
}
