use serde::{Deserialize, Serialize};

use super::tier::DifficultyTier;
use super::weights::JointWeights;
use crate::baseline::Baseline;
use crate::pose::{angle_difference, AngleName, JointAngleSet};

/// Multiplier applied to scores that fall short of the tier's pass mark
pub const BELOW_PASS_PENALTY: f64 = 0.8;

/// Contribution of one angle to a score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointScore {
    pub angle: AngleName,
    pub live: f64,
    pub target: f64,
    /// |live - target| in degrees, wrapped into 0..=180
    pub error: f64,
    /// 0..100
    pub score: f64,
    pub weight: f64,
}

/// Weighted score over the angles present in both live data and baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Weighted average before the pass penalty
    pub weighted: f64,
    /// Final score, 0..100
    pub value: f64,
    pub penalized: bool,
    pub joints: Vec<JointScore>,
}

/// Outcome of scoring one sample.
///
/// `Unavailable` means no angle could be compared (empty input, missing
/// baseline, no overlap); it reads as a score of 0.
#[derive(Debug, Clone, PartialEq)]
pub enum Score {
    Scored(ScoreCard),
    Unavailable,
}

impl Score {
    pub fn value(&self) -> f64 {
        match self {
            Score::Scored(card) => card.value,
            Score::Unavailable => 0.0,
        }
    }

    /// Integer score (truncated), 0..=100
    pub fn as_int(&self) -> u8 {
        // absorb float noise such as 94.99999999999999 before truncating
        (self.value() + 1e-9).clamp(0.0, 100.0).floor() as u8
    }

    pub fn card(&self) -> Option<&ScoreCard> {
        match self {
            Score::Scored(card) => Some(card),
            Score::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Score::Scored(_))
    }
}

/// Weighted, difficulty-adjusted comparison of live angles against a baseline
#[derive(Debug, Clone, Default)]
pub struct AccuracyScorer {
    weights: JointWeights,
}

impl AccuracyScorer {
    pub fn new(weights: JointWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &JointWeights {
        &self.weights
    }

    pub fn score(&self, live: &JointAngleSet, baseline: &Baseline, tier: &DifficultyTier) -> Score {
        score(live, baseline, tier, &self.weights)
    }
}

/// Scores live angles against `baseline` under `tier`.
///
/// Each angle present in `live`, `baseline` and `weights` scores
/// `max(0, 100 - error / tolerance * 100)`, where the tolerance is the
/// angle's critical threshold scaled by the tier. The weighted average is
/// returned as is when it reaches the tier's pass mark and multiplied by
/// [`BELOW_PASS_PENALTY`] otherwise.
pub fn score(
    live: &JointAngleSet,
    baseline: &Baseline,
    tier: &DifficultyTier,
    weights: &JointWeights,
) -> Score {
    let scale = tier.tolerance_scale();
    let mut joints = Vec::new();
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (angle, live_deg) in live.iter() {
        let (Some(target), Some(weight)) = (baseline.target(angle), weights.get(angle)) else {
            continue;
        };
        let error = angle_difference(live_deg, target);
        let tolerance = weight.critical_threshold * scale;
        let joint_score = (100.0 - (error / tolerance) * 100.0).max(0.0);

        weighted_sum += joint_score * weight.weight;
        total_weight += weight.weight;
        joints.push(JointScore {
            angle,
            live: live_deg,
            target,
            error,
            score: joint_score,
            weight: weight.weight,
        });
    }

    if total_weight <= 0.0 {
        return Score::Unavailable;
    }

    let weighted = weighted_sum / total_weight;
    let penalized = weighted < tier.pass_score();
    let value = if penalized {
        weighted * BELOW_PASS_PENALTY
    } else {
        weighted
    };

    Score::Scored(ScoreCard {
        weighted,
        value,
        penalized,
        joints,
    })
}
