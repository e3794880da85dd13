//! # Talos ML Priority Engine
//!
//! Learned urgency prediction fused with fuzzy-logic adjustment:
//!
//! ```text
//!   Task + System State ──► Feature Extraction (23 features)
//!                                    │
//!                                    ▼
//!                           Weighted Inference ──► sigmoid ──► urgency
//!                                    │
//!                                    ▼
//!          base priority + urgency·recovery − energy penalty
//!                                    │
//!                                    ▼
//!                           Fuzzy Adjustment ──► clamp [0,1]
//! ```
//!
//! The model weights are compiled in; a periodic integrity check guards
//! them and latches a safe 0.5-urgency fallback on mismatch.

#![warn(missing_docs)]

pub mod engine;
pub mod features;
pub mod model;
pub mod rng;

pub use engine::PriorityEngine;
pub use features::FeatureVector;
pub use rng::Xorshift32;
