use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pose::AngleName;

/// Relative importance and tolerance of one tracked angle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointWeight {
    pub name: String,
    /// Relative importance, > 0
    pub weight: f64,
    /// Tolerance in degrees at tier 1
    pub critical_threshold: f64,
}

impl JointWeight {
    pub fn new(name: impl Into<String>, weight: f64, critical_threshold: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            critical_threshold,
        }
    }
}

/// Weight table keyed by angle name
#[derive(Debug, Clone, PartialEq)]
pub struct JointWeights {
    table: BTreeMap<AngleName, JointWeight>,
}

impl JointWeights {
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    pub fn with(mut self, angle: AngleName, weight: JointWeight) -> Self {
        self.insert(angle, weight);
        self
    }

    /// Non-positive weights are ignored, the scorer divides by their sum
    pub fn insert(&mut self, angle: AngleName, weight: JointWeight) {
        if weight.weight > 0.0 && weight.critical_threshold > 0.0 {
            self.table.insert(angle, weight);
        } else {
            tracing::warn!("[scoring] ignoring non-positive weight for {}", angle);
        }
    }

    pub fn get(&self, angle: AngleName) -> Option<&JointWeight> {
        self.table.get(&angle)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for JointWeights {
    fn default() -> Self {
        use AngleName::*;
        let entries = [
            (SpineAngle, JointWeight::new("Spine", 1.5, 10.0)),
            (HipAlignment, JointWeight::new("Hips", 1.2, 15.0)),
            (ShoulderAlignment, JointWeight::new("Shoulders", 1.0, 20.0)),
            (LeftHipAngle, JointWeight::new("Left Hip", 1.2, 15.0)),
            (RightHipAngle, JointWeight::new("Right Hip", 1.2, 15.0)),
            (LeftKneeAngle, JointWeight::new("Left Knee", 1.0, 20.0)),
            (RightKneeAngle, JointWeight::new("Right Knee", 1.0, 20.0)),
            (LeftElbowAngle, JointWeight::new("Left Elbow", 0.8, 25.0)),
            (RightElbowAngle, JointWeight::new("Right Elbow", 0.8, 25.0)),
            (LeftShoulderAngle, JointWeight::new("Left Shoulder", 1.0, 20.0)),
            (RightShoulderAngle, JointWeight::new("Right Shoulder", 1.0, 20.0)),
            (NeckAngle, JointWeight::new("Neck", 1.3, 12.0)),
        ];
        Self {
            table: entries.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_every_angle() {
        let weights = JointWeights::default();
        for angle in AngleName::ALL {
            assert!(weights.get(angle).is_some(), "no weight for {}", angle);
        }
    }

    #[test]
    fn test_default_values() {
        let weights = JointWeights::default();
        let spine = weights.get(AngleName::SpineAngle).unwrap();
        assert_eq!(spine.weight, 1.5);
        assert_eq!(spine.critical_threshold, 10.0);
        let neck = weights.get(AngleName::NeckAngle).unwrap();
        assert_eq!(neck.name, "Neck");
        assert_eq!(neck.critical_threshold, 12.0);
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let weights = JointWeights::empty()
            .with(AngleName::LeftHipAngle, JointWeight::new("Left Hip", 0.0, 15.0))
            .with(AngleName::RightHipAngle, JointWeight::new("Right Hip", 1.0, -1.0));
        assert!(weights.is_empty());
    }
}
