use serde::{Deserialize, Serialize};

/// Tolerance tier 1 is expressed in; other tiers scale joint tolerances
/// relative to it.
pub const REFERENCE_TOLERANCE_DEG: f64 = 15.0;

/// Difficulty configuration for a user level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTier {
    /// Base joint tolerance in degrees
    pub base_tolerance: f64,
    /// Fraction (0..1) of a perfect score needed to pass without penalty
    pub required_accuracy: f64,
    /// XP multiplier, at least 1
    pub xp_multiplier: f64,
}

const TIERS: [DifficultyTier; 3] = [
    DifficultyTier {
        base_tolerance: 20.0,
        required_accuracy: 0.7,
        xp_multiplier: 1.0,
    },
    DifficultyTier {
        base_tolerance: 15.0,
        required_accuracy: 0.8,
        xp_multiplier: 1.5,
    },
    DifficultyTier {
        base_tolerance: 10.0,
        required_accuracy: 0.9,
        xp_multiplier: 2.0,
    },
];

impl DifficultyTier {
    /// Tier for a user level; levels are clamped into 1..=3
    pub fn for_level(level: u32) -> Self {
        TIERS[level.clamp(1, 3) as usize - 1]
    }

    /// Tier used when no profile is known
    pub fn for_profile(level: Option<u32>) -> Self {
        level.map(Self::for_level).unwrap_or_default()
    }

    /// Multiplier applied to a joint's critical threshold
    pub fn tolerance_scale(&self) -> f64 {
        self.base_tolerance / REFERENCE_TOLERANCE_DEG
    }

    /// Passing score on the 0..100 scale
    pub fn pass_score(&self) -> f64 {
        self.required_accuracy * 100.0
    }

    /// Extra XP factor for stricter tiers; never below 1
    pub fn difficulty_factor(&self) -> f64 {
        (REFERENCE_TOLERANCE_DEG / self.base_tolerance).max(1.0)
    }
}

impl Default for DifficultyTier {
    fn default() -> Self {
        TIERS[0]
    }
}
