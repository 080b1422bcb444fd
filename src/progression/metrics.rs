use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::baseline::PoseId;
use crate::session::RepResult;

/// Aggregates over a rep history that achievements are judged against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseMetrics {
    /// Mean accuracy fraction, 0..=1
    pub accuracy: f64,
    /// `1 - stddev` of accuracy fractions; 0 with fewer than two reps
    pub consistency: f64,
    pub streak: u32,
    pub completed_poses: BTreeSet<PoseId>,
    pub total_reps: u32,
}

impl ExerciseMetrics {
    pub fn from_history<'a, I>(reps: I, streak: u32) -> Self
    where
        I: IntoIterator<Item = &'a RepResult>,
    {
        let mut fractions = Vec::new();
        let mut completed_poses = BTreeSet::new();
        for rep in reps {
            fractions.push(rep.accuracy_fraction());
            completed_poses.insert(rep.pose_id.clone());
        }
        Self {
            accuracy: mean(&fractions).unwrap_or(0.0),
            consistency: consistency(&fractions),
            streak,
            completed_poses,
            total_reps: u32::try_from(fractions.len()).unwrap_or(u32::MAX),
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `1 - population stddev`, clamped to 0..=1
pub fn consistency(fractions: &[f64]) -> f64 {
    if fractions.len() < 2 {
        return 0.0;
    }
    let Some(m) = mean(fractions) else {
        return 0.0;
    };
    let variance = fractions.iter().map(|f| (f - m).powi(2)).sum::<f64>() / fractions.len() as f64;
    (1.0 - variance.sqrt()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn rep(pose: &str, score: u8) -> RepResult {
        RepResult::new(PoseId::from(pose), Uuid::nil(), 1, score, Utc::now())
    }

    #[test]
    fn test_empty_history() {
        let history: Vec<RepResult> = Vec::new();
        let m = ExerciseMetrics::from_history(&history, 0);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.consistency, 0.0);
        assert_eq!(m.total_reps, 0);
    }

    #[test]
    fn test_single_rep_has_no_consistency() {
        let reps = [rep("FullRollUp", 90)];
        let m = ExerciseMetrics::from_history(&reps, 1);
        assert!(approx_eq(m.accuracy, 0.9, 1e-9));
        assert_eq!(m.consistency, 0.0);
        assert!(m.completed_poses.contains(&PoseId::from("FullRollUp")));
    }

    #[test]
    fn test_consistency_of_spread_scores() {
        // fractions 0.7 and 0.9: stddev 0.1
        let reps = [rep("A", 70), rep("B", 90)];
        let m = ExerciseMetrics::from_history(&reps, 2);
        assert!(approx_eq(m.accuracy, 0.8, 1e-9));
        assert!(approx_eq(m.consistency, 0.9, 1e-9));
        assert_eq!(m.completed_poses.len(), 2);
        assert_eq!(m.streak, 2);
    }

    #[test]
    fn test_identical_scores_fully_consistent() {
        let reps = vec![rep("A", 80); 4];
        assert!(approx_eq(ExerciseMetrics::from_history(&reps, 0).consistency, 1.0, 1e-9));
    }
}
