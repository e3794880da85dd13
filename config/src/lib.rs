//! # Talos System Configuration
//!
//! Compile-time constants and the small shared enums every subsystem needs:
//! task criticality levels, the system health state, and the system state
//! vector sampled by the scheduler and the ML priority engine.
//!
//! Everything here is plain data. Subsystem behavior lives in the subsystem
//! crates; this crate only pins down the numbers they agree on.

#![warn(missing_docs)]

// =============================================================================
// System Constants
// =============================================================================

/// Maximum number of task slots in the registry.
pub const MAX_TASKS: usize = 32;

/// Number of base priority levels (valid priorities are `0..MAX_PRIORITY_LEVELS`).
pub const MAX_PRIORITY_LEVELS: u32 = 16;

/// Granularity of the simulated system tick, in milliseconds.
pub const SYSTEM_TICK_MS: u64 = 1;

/// Period of the scheduler loop, in milliseconds.
pub const SCHEDULER_PERIOD_MS: u64 = 10;

/// Period of the fault monitor (TMR voting) loop, in milliseconds.
pub const VOTING_PERIOD_MS: u64 = 10;

/// Number of cores on the simulated target.
pub const NUM_CORES: u8 = 4;

// ML constants

/// Length of the ML feature vector.
pub const ML_FEATURE_COUNT: usize = 23;

/// Number of quantisation levels used by the fuzzy priority adjuster.
pub const FUZZY_LEVELS: usize = 5;

// =============================================================================
// Task Criticality
// =============================================================================

/// Task criticality classification (Design Assurance Level).
///
/// DAL-A and DAL-B tasks are watchdog-protected from the moment they are
/// created; lower levels only get a watchdog if one is armed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Criticality {
    /// Safety-critical.
    DalA,
    /// Mission-critical.
    DalB,
    /// Important.
    DalC,
    /// Non-critical.
    DalD,
}

impl Criticality {
    /// Whether tasks of this level get a watchdog armed at creation.
    pub fn is_safety_relevant(self) -> bool {
        matches!(self, Self::DalA | Self::DalB)
    }

    /// Fuzzy criticality level consumed by the priority adjuster.
    ///
    /// The mapping is deliberately non-linear: DAL-C maps to level 3, not 2,
    /// so that mid-criticality tasks sit closer to the non-critical end of
    /// the membership matrix.
    pub fn fuzzy_level(self) -> usize {
        match self {
            Self::DalA => 0,
            Self::DalB => 1,
            Self::DalC => 3,
            Self::DalD => 4,
        }
    }

    /// Numeric encoding used as an ML feature.
    pub fn as_feature(self) -> f32 {
        match self {
            Self::DalA => 0.0,
            Self::DalB => 1.0,
            Self::DalC => 2.0,
            Self::DalD => 3.0,
        }
    }
}

// =============================================================================
// System Health
// =============================================================================

/// Overall health of the simulated system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemHealth {
    /// All bounds satisfied.
    #[default]
    Normal,
    /// A recovery action is in progress.
    Recovery,
    /// Load or thermal bounds exceeded.
    Degraded,
}

impl SystemHealth {
    /// Numeric encoding used as an ML feature.
    pub fn as_feature(self) -> f32 {
        match self {
            Self::Normal => 0.0,
            Self::Recovery => 1.0,
            Self::Degraded => 2.0,
        }
    }

    /// Human-readable name for log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Recovery => "RECOVERY",
            Self::Degraded => "DEGRADED",
        }
    }
}

// =============================================================================
// System State Vector
// =============================================================================

/// Snapshot of the simulated system, sampled by the kernel and consumed by
/// the scheduler and the ML priority engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStateVector {
    /// CPU load in `[0, 1]`.
    pub cpu_load: f32,
    /// Memory usage in `[0, 1]`.
    pub memory_usage: f32,
    /// Die temperature in degrees Celsius.
    pub temperature: f32,
    /// Power draw in watts.
    pub power_draw: f32,
    /// Number of active tasks in the registry.
    pub active_tasks: u32,
    /// Current health classification.
    pub health: SystemHealth,
}

impl Default for SystemStateVector {
    fn default() -> Self {
        Self {
            cpu_load: 0.0,
            memory_usage: 0.0,
            temperature: 25.0,
            power_draw: 1.0,
            active_tasks: 0,
            health: SystemHealth::Normal,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
