//! # Feature Extraction
//!
//! Maps a task descriptor plus the current system state onto the model's
//! 23-feature input vector.

use crate::rng::Xorshift32;
use talos_config::{SystemStateVector, MAX_PRIORITY_LEVELS, MAX_TASKS, ML_FEATURE_COUNT};
use talos_execution::Task;

/// Index of the first reserved feature slot.
pub const RESERVED_FEATURES_START: usize = 16;

/// A model input vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(
    /// Raw feature values, indexed per the extraction layout.
    pub [f32; ML_FEATURE_COUNT],
);

impl FeatureVector {
    /// Extract the feature vector for `task` under `sys`.
    ///
    /// Layout:
    /// - 0..5: execution timing (estimate, period, deadline, last observed,
    ///   most recent history sample)
    /// - 5..8: history statistics (mean, variance, missed deadlines)
    /// - 8..10: criticality and normalized base priority
    /// - 10..16: system state (load, memory, temperature/100, power/5,
    ///   active tasks/MAX_TASKS, health)
    /// - 16..23: reserved; filled with uniform `[0, 1)` draws from `rng`
    ///   until real signals exist for these slots
    pub fn extract(task: &Task, sys: &SystemStateVector, rng: &mut Xorshift32) -> Self {
        let mut f = [0.0f32; ML_FEATURE_COUNT];

        f[0] = task.execution_time_ms as f32;
        f[1] = task.period_ms as f32;
        f[2] = task.deadline_ms as f32;
        f[3] = task.last_execution_ms as f32;
        f[4] = task.execution_history[0];

        f[5] = task.history_mean();
        f[6] = task.history_variance();
        f[7] = task.missed_deadlines as f32;

        f[8] = task.criticality.as_feature();
        f[9] = task.base_priority as f32 / MAX_PRIORITY_LEVELS as f32;

        f[10] = sys.cpu_load;
        f[11] = sys.memory_usage;
        f[12] = sys.temperature / 100.0;
        f[13] = sys.power_draw / 5.0;
        f[14] = sys.active_tasks as f32 / MAX_TASKS as f32;
        f[15] = sys.health.as_feature();

        for slot in f.iter_mut().skip(RESERVED_FEATURES_START) {
            *slot = rng.next_f32();
        }

        #[cfg(feature = "trace-features")]
        log::trace!("[ml] features for task {}: {:?}", task.id, f);

        Self(f)
    }

    /// Dot product with a weight table of the same length.
    pub fn dot(&self, weights: &[f32; ML_FEATURE_COUNT]) -> f32 {
        self.0
            .iter()
            .zip(weights.iter())
            .map(|(f, w)| f * w)
            .sum()
    }
}

// =============================================================================
// Tests
// =============================================================================
