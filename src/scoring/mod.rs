//! Accuracy scoring of live joint angles against a pose baseline
//!
//! # Components
//! - `tier.rs`: difficulty tiers keyed by user level
//! - `weights.rs`: per-angle weight and tolerance table
//! - `scorer.rs`: weighted, tier-adjusted 0-100 score

pub mod scorer;
pub mod tier;
pub mod weights;

pub use scorer::{score, AccuracyScorer, JointScore, Score, ScoreCard, BELOW_PASS_PENALTY};
pub use tier::{DifficultyTier, REFERENCE_TOLERANCE_DEG};
pub use weights::{JointWeight, JointWeights};
