//! Rule-based corrective feedback
//!
//! # Components
//! - `rules.rs`: stability, alignment, symmetry and worst-angle rules
//! - `pose_specific.rs`: checks registered for individual poses
//!
//! Rules run in a fixed order and their results are concatenated in that
//! order; the first correction is the one a UI shows as primary.

pub mod pose_specific;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::baseline::{Baseline, PoseId};
use crate::config::CorrectionConfig;
use crate::pose::{JointName, Skeleton};

pub use pose_specific::{PoseRule, PoseRules, SpineStraightness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrectionKind {
    Alignment,
    Angle,
    Stability,
    Symmetry,
}

/// One diagnostic message about the current posture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseCorrection {
    pub kind: CorrectionKind,
    pub message: String,
    /// 0.0..=1.0
    pub severity: f64,
    pub affected_joints: Vec<JointName>,
}

impl PoseCorrection {
    /// Severity is clamped into `[0, 1]`
    pub fn new(
        kind: CorrectionKind,
        message: impl Into<String>,
        severity: f64,
        affected_joints: Vec<JointName>,
    ) -> Self {
        let severity = if severity.is_nan() { 0.0 } else { severity.clamp(0.0, 1.0) };
        Self {
            kind,
            message: message.into(),
            severity,
            affected_joints,
        }
    }
}

/// Runs every rule against one sample.
///
/// Pure with respect to its inputs: the same skeleton, baseline and pose
/// always give the same corrections.
pub struct CorrectionGenerator {
    config: CorrectionConfig,
    pose_rules: PoseRules,
}

impl CorrectionGenerator {
    pub fn new(config: CorrectionConfig, pose_rules: PoseRules) -> Self {
        Self { config, pose_rules }
    }

    pub fn from_config(config: &CorrectionConfig) -> Self {
        Self::new(config.clone(), PoseRules::default())
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Order: stability, alignment, symmetry, worst angle, pose-specific.
    /// The angle rule is skipped without a baseline, the pose rule without a
    /// pose.
    pub fn generate(
        &self,
        skeleton: &Skeleton,
        baseline: Option<&Baseline>,
        pose: Option<&PoseId>,
    ) -> Vec<PoseCorrection> {
        let config = &self.config;
        [
            rules::stability(skeleton, config),
            rules::alignment(skeleton, config),
            rules::symmetry(skeleton, config),
            baseline.and_then(|b| rules::joint_deviation(skeleton, b, config)),
            pose.and_then(|p| self.pose_rules.check(p, skeleton, config)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl Default for CorrectionGenerator {
    fn default() -> Self {
        Self::from_config(&CorrectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{AngleName, Keypoint};

    /// Upright, level, symmetric figure at high confidence
    fn ideal_skeleton() -> Skeleton {
        let joints = [
            (JointName::Neck, 0.50, 0.80),
            (JointName::LeftShoulder, 0.54, 0.78),
            (JointName::RightShoulder, 0.46, 0.78),
            (JointName::Root, 0.50, 0.50),
            (JointName::LeftHip, 0.53, 0.50),
            (JointName::RightHip, 0.47, 0.50),
            (JointName::LeftKnee, 0.53, 0.30),
            (JointName::RightKnee, 0.47, 0.30),
        ];
        joints.iter().fold(Skeleton::new(), |s, (j, x, y)| {
            s.with(*j, Keypoint::new(*x, *y, 0.95))
        })
    }

    fn baseline_for(skeleton: &Skeleton) -> Baseline {
        [AngleName::SpineAngle, AngleName::LeftHipAngle, AngleName::RightHipAngle]
            .into_iter()
            .filter_map(|a| a.spec().measure(skeleton).map(|deg| (a, deg)))
            .collect()
    }

    #[test]
    fn test_ideal_pose_has_no_corrections() {
        let skeleton = ideal_skeleton();
        let baseline = baseline_for(&skeleton);
        let generator = CorrectionGenerator::default();
        let corrections =
            generator.generate(&skeleton, Some(&baseline), Some(&PoseId::from("FullRollUp")));
        assert!(corrections.is_empty(), "{:?}", corrections);
    }

    #[test]
    fn test_rule_order() {
        // low confidence, uneven hips, wide shoulders, crooked spine
        let skeleton = Skeleton::new()
            .with(JointName::Neck, Keypoint::new(0.8, 0.8, 0.5))
            .with(JointName::Root, Keypoint::new(0.5, 0.5, 0.5))
            .with(JointName::LeftShoulder, Keypoint::new(0.8, 0.8, 0.5))
            .with(JointName::RightShoulder, Keypoint::new(0.3, 0.8, 0.5))
            .with(JointName::LeftHip, Keypoint::new(0.55, 0.6, 0.5))
            .with(JointName::RightHip, Keypoint::new(0.45, 0.4, 0.5));
        let baseline = Baseline::new().with(AngleName::SpineAngle, 90.0);
        let corrections = CorrectionGenerator::default().generate(
            &skeleton,
            Some(&baseline),
            Some(&PoseId::from("FullRollUp")),
        );
        let kinds: Vec<CorrectionKind> = corrections.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CorrectionKind::Stability,
                CorrectionKind::Alignment,
                CorrectionKind::Symmetry,
                CorrectionKind::Angle,
                CorrectionKind::Alignment,
            ]
        );
        assert_eq!(corrections[4].affected_joints, vec![JointName::Neck, JointName::Root]);
    }

    #[test]
    fn test_empty_skeleton_yields_nothing() {
        let baseline = Baseline::new().with(AngleName::LeftHipAngle, 90.0);
        let corrections = CorrectionGenerator::default().generate(
            &Skeleton::new(),
            Some(&baseline),
            Some(&PoseId::from("FullRollUp")),
        );
        assert!(corrections.is_empty());
    }

    #[test]
    fn test_severity_clamped() {
        let c = PoseCorrection::new(CorrectionKind::Angle, "x", 3.0, vec![]);
        assert_eq!(c.severity, 1.0);
        let c = PoseCorrection::new(CorrectionKind::Angle, "x", -1.0, vec![]);
        assert_eq!(c.severity, 0.0);
        let c = PoseCorrection::new(CorrectionKind::Angle, "x", f64::NAN, vec![]);
        assert_eq!(c.severity, 0.0);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let skeleton = ideal_skeleton().with(JointName::LeftHip, Keypoint::new(0.53, 0.3, 0.6));
        let baseline = baseline_for(&ideal_skeleton());
        let generator = CorrectionGenerator::default();
        let a = generator.generate(&skeleton, Some(&baseline), None);
        let b = generator.generate(&skeleton, Some(&baseline), None);
        assert_eq!(a, b);
    }
}
