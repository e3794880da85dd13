//! # Priority Engine
//!
//! Urgency inference and the dynamic priority formula. The engine is
//! shared by the scheduler (per-tick scoring) and the kernel monitor loop
//! (periodic integrity check).

use crate::features::FeatureVector;
use crate::model::{self, MEMBERSHIP, WEIGHTS};
use crate::rng::Xorshift32;

use talos_config::{SystemStateVector, MAX_PRIORITY_LEVELS};
use talos_execution::{Task, TaskId};
use talos_fault::{FaultKind, FaultMonitor};

use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Urgency reported while the model is unavailable.
const FALLBACK_URGENCY: f32 = 0.5;

/// The ML priority engine.
pub struct PriorityEngine {
    /// Whether a model is considered loaded. Inference degrades to the
    /// fallback urgency while this is false.
    model_loaded: AtomicBool,
    /// Latched by a failed integrity check; never cleared at runtime.
    integrity_failed: AtomicBool,
    /// Checksum of the weight table captured at construction.
    expected_checksum: u32,
    /// Generator backing the reserved feature slots.
    rng: Mutex<Xorshift32>,
}

impl PriorityEngine {
    /// Create an engine with the compiled-in model, seeding the reserved
    /// feature generator from the wall clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
            .unwrap_or(0x00c0_ffee);
        Self::with_seed(seed)
    }

    /// Create an engine with a fixed reserved-feature seed.
    pub fn with_seed(seed: u32) -> Self {
        log::info!("[ml] engine initialized, model loaded");
        Self {
            model_loaded: AtomicBool::new(true),
            integrity_failed: AtomicBool::new(false),
            expected_checksum: model::weights_checksum(),
            rng: Mutex::new(Xorshift32::new(seed)),
        }
    }

    #[cfg(test)]
    fn unloaded() -> Self {
        let engine = Self::with_seed(1);
        engine.model_loaded.store(false, Ordering::Release);
        engine
    }

    /// Predicted urgency of `task` under `sys`, in `(0, 1)`.
    ///
    /// Falls back to 0.5 while no model is loaded or after the integrity
    /// check has latched.
    pub fn predict_urgency(&self, task: &Task, sys: &SystemStateVector) -> f32 {
        if !self.model_loaded.load(Ordering::Acquire) {
            log::warn!("[ml] model not loaded, using default urgency");
            return FALLBACK_URGENCY;
        }
        if self.integrity_failed.load(Ordering::Acquire) {
            return FALLBACK_URGENCY;
        }

        let features = {
            let mut rng = self.rng.lock();
            FeatureVector::extract(task, sys, &mut rng)
        };
        model::sigmoid(features.dot(&WEIGHTS))
    }

    /// Fuzzy adjustment of `base_score` for `task` under `sys`.
    ///
    /// Load, temperature and power are quantised onto the five fuzzy
    /// levels; the membership of each against the task's criticality
    /// level is blended 0.5/0.3/0.2 and scales the base score. No
    /// clamping happens here.
    pub fn fuzzy_adjust(&self, task: &Task, base_score: f32, sys: &SystemStateVector) -> f32 {
        let load_level = model::fuzzy_level(sys.cpu_load, 0.0, 1.0);
        let temp_level = model::fuzzy_level(sys.temperature, 20.0, 80.0);
        let power_level = model::fuzzy_level(sys.power_draw, 0.5, 5.0);
        let criticality = task.criticality.fuzzy_level();

        let load_factor = MEMBERSHIP[load_level][criticality];
        let temp_factor = MEMBERSHIP[temp_level][criticality];
        let power_factor = MEMBERSHIP[power_level][criticality];

        let adjustment = 0.5 * load_factor + 0.3 * temp_factor + 0.2 * power_factor;
        base_score * adjustment
    }

    /// The dynamic priority of `task`, in `[0, 1]`.
    ///
    /// `base + urgency·recovery − penalty`, fuzzy-adjusted and clamped.
    /// The power-draw penalty takes precedence over the thermal one; at
    /// most one penalty is applied.
    pub fn dynamic_priority(
        &self,
        task: &Task,
        sys: &SystemStateVector,
        faults: &FaultMonitor,
    ) -> f32 {
        let base = task.base_priority as f32 / MAX_PRIORITY_LEVELS as f32;
        let urgency = self.predict_urgency(task, sys);
        let recovery = faults.recovery_factor(task.id);

        let penalty = if sys.power_draw > 4.0 {
            0.20
        } else if sys.temperature > 70.0 {
            0.15
        } else {
            0.0
        };

        let score = base + urgency * recovery - penalty;
        self.fuzzy_adjust(task, score, sys).clamp(0.0, 1.0)
    }

    /// Verify the weight table against the construction-time checksum.
    ///
    /// On mismatch the engine latches the fallback urgency and raises a
    /// computation fault against task 0 through the monitor.
    pub fn integrity_check(&self, faults: &FaultMonitor) -> bool {
        if model::weights_checksum() == self.expected_checksum {
            log::debug!("[ml] model integrity verified");
            return true;
        }

        log::error!("[ml] model integrity check FAILED, latching fallback");
        self.integrity_failed.store(true, Ordering::Release);
        let _ = faults.inject(FaultKind::Computation, TaskId::from_raw(0), 0);
        false
    }

    /// Load a model from `path`.
    ///
    /// The simulation ships its weights compiled in, so this only records
    /// the request and marks the model loaded; no bytes are read.
    pub fn load_model(&self, path: &str) {
        log::info!("[ml] loading model from {path} (compiled-in weights in use)");
        self.model_loaded.store(true, Ordering::Release);
    }
}

impl Default for PriorityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
