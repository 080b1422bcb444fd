use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::metrics::ExerciseMetrics;
use crate::baseline::PoseId;

/// All conditions must hold for an achievement to unlock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default)]
    pub min_accuracy: f64,
    #[serde(default)]
    pub min_consistency: f64,
    #[serde(default)]
    pub min_streak: u32,
    #[serde(default)]
    pub min_reps: u32,
    #[serde(default)]
    pub required_poses: BTreeSet<PoseId>,
}

impl Requirement {
    pub fn is_met(&self, metrics: &ExerciseMetrics) -> bool {
        metrics.accuracy >= self.min_accuracy
            && metrics.consistency >= self.min_consistency
            && metrics.streak >= self.min_streak
            && metrics.total_reps >= self.min_reps
            && self.required_poses.is_subset(&metrics.completed_poses)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirement: Requirement,
    pub xp_reward: u64,
}

impl Achievement {
    pub fn new(id: &str, name: &str, description: &str, requirement: Requirement, xp_reward: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            requirement,
            xp_reward,
        }
    }
}

/// Static list of achievements a profile can unlock
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementCatalog {
    achievements: Vec<Achievement>,
}

impl AchievementCatalog {
    /// Later entries with an id already present are dropped
    pub fn new(achievements: Vec<Achievement>) -> Self {
        let mut seen = BTreeSet::new();
        let achievements = achievements
            .into_iter()
            .filter(|a| {
                let fresh = seen.insert(a.id.clone());
                if !fresh {
                    tracing::warn!("[achievement] duplicate id '{}' ignored", a.id);
                }
                fresh
            })
            .collect();
        Self { achievements }
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter()
    }

    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }
}

impl Default for AchievementCatalog {
    fn default() -> Self {
        Self::new(vec![
            Achievement::new(
                "first_steps",
                "First Steps",
                "Complete your first repetition",
                Requirement { min_reps: 1, ..Requirement::default() },
                10,
            ),
            Achievement::new(
                "three_day_streak",
                "3-Day Streak",
                "Practise three days in a row",
                Requirement { min_streak: 3, ..Requirement::default() },
                25,
            ),
            Achievement::new(
                "week_warrior",
                "Week Warrior",
                "Practise seven days in a row",
                Requirement { min_streak: 7, ..Requirement::default() },
                75,
            ),
            Achievement::new(
                "precision_practitioner",
                "Precision Practitioner",
                "Average 90% accuracy over at least 10 reps",
                Requirement { min_accuracy: 0.9, min_reps: 10, ..Requirement::default() },
                50,
            ),
            Achievement::new(
                "steady_form",
                "Steady Form",
                "Keep your accuracy within a narrow band over 10 reps",
                Requirement { min_consistency: 0.9, min_reps: 10, ..Requirement::default() },
                50,
            ),
            Achievement::new(
                "roll_up_master",
                "Roll Up Master",
                "Complete the full roll up with 85% average accuracy",
                Requirement {
                    min_accuracy: 0.85,
                    required_poses: BTreeSet::from([PoseId::from(PoseId::FULL_ROLL_UP)]),
                    ..Requirement::default()
                },
                100,
            ),
        ])
    }
}
