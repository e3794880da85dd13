//! # Model Coefficients
//!
//! The compiled-in urgency model and the fuzzy membership matrix. These
//! tables are load-bearing constants: the scheduler's ML policy is only
//! reproducible across builds if they match bit for bit.

use talos_config::{FUZZY_LEVELS, ML_FEATURE_COUNT};

/// Per-feature weights of the urgency model.
pub const WEIGHTS: [f32; ML_FEATURE_COUNT] = [
    0.87, 0.65, 0.42, 0.91, 0.38, // execution time features
    0.76, 0.52, 0.44, 0.89, 0.21, // deadline features
    0.67, 0.59, 0.48, 0.71, 0.35, // resource usage features
    0.92, 0.37, 0.63, 0.50, 0.77, // system state features
    0.45, 0.81, 0.62, // energy features
];

/// Fuzzy membership matrix.
///
/// `MEMBERSHIP[s][c]` is the membership of system fuzzy level `s` in
/// criticality fuzzy level `c`. The matrix is symmetric with a unit
/// diagonal: a task whose criticality level coincides with the system
/// stress level gets the full factor.
pub const MEMBERSHIP: [[f32; FUZZY_LEVELS]; FUZZY_LEVELS] = [
    [1.0, 0.7, 0.3, 0.1, 0.0],
    [0.7, 1.0, 0.7, 0.3, 0.1],
    [0.3, 0.7, 1.0, 0.7, 0.3],
    [0.1, 0.3, 0.7, 1.0, 0.7],
    [0.0, 0.1, 0.3, 0.7, 1.0],
];

static_assertions::const_assert_eq!(WEIGHTS.len(), ML_FEATURE_COUNT);
static_assertions::const_assert_eq!(MEMBERSHIP.len(), FUZZY_LEVELS);
static_assertions::const_assert_eq!(MEMBERSHIP[0].len(), FUZZY_LEVELS);

/// Logistic sigmoid.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Quantise `value` from `[min, max]` onto the fuzzy level scale.
///
/// Values outside the range saturate at the first or last level.
pub fn fuzzy_level(value: f32, min: f32, max: f32) -> usize {
    let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
    (normalized * (FUZZY_LEVELS - 1) as f32) as usize
}

/// Checksum over the compiled-in weights, used by the integrity check.
pub fn weights_checksum() -> u32 {
    WEIGHTS
        .iter()
        .fold(0u32, |acc, w| acc.rotate_left(7) ^ w.to_bits())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_symmetric_with_unit_diagonal() {
        for i in 0..FUZZY_LEVELS {
            assert_eq!(MEMBERSHIP[i][i], 1.0);
            for j in 0..FUZZY_LEVELS {
                assert_eq!(MEMBERSHIP[i][j], MEMBERSHIP[j][i]);
            }
        }
    }

    #[test]
    fn weights_stay_in_documented_band() {
        for w in WEIGHTS {
            assert!((0.21..=0.92).contains(&w));
        }
    }

    #[test]
    fn sigmoid_is_bounded_and_centred() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn fuzzy_levels_saturate() {
        assert_eq!(fuzzy_level(-1.0, 0.0, 1.0), 0);
        assert_eq!(fuzzy_level(0.0, 0.0, 1.0), 0);
        assert_eq!(fuzzy_level(0.5, 0.0, 1.0), 2);
        assert_eq!(fuzzy_level(1.0, 0.0, 1.0), 4);
        assert_eq!(fuzzy_level(2.0, 0.0, 1.0), 4);
    }

    #[test]
    fn temperature_quantisation_uses_the_20_80_band() {
        assert_eq!(fuzzy_level(20.0, 20.0, 80.0), 0);
        assert_eq!(fuzzy_level(50.0, 20.0, 80.0), 2);
        assert_eq!(fuzzy_level(80.0, 20.0, 80.0), 4);
    }

    #[test]
    fn checksum_is_stable() {
        assert_eq!(weights_checksum(), weights_checksum());
        assert_ne!(weights_checksum(), 0);
    }
}
