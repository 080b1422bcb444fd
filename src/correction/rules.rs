//! Independent diagnostic rules. Each looks at one skeleton sample and
//! returns at most one correction; a rule whose inputs are missing returns
//! `None`.

use super::{CorrectionKind, PoseCorrection};
use crate::baseline::Baseline;
use crate::config::CorrectionConfig;
use crate::pose::{angle_difference, JointName, Keypoint, Skeleton};

const PAIR_JOINTS: [JointName; 4] = [
    JointName::LeftShoulder,
    JointName::RightShoulder,
    JointName::LeftHip,
    JointName::RightHip,
];

/// Low mean detector confidence means the user is moving or partly hidden
pub fn stability(skeleton: &Skeleton, config: &CorrectionConfig) -> Option<PoseCorrection> {
    let mean = skeleton.average_confidence()?;
    if mean >= config.stability_threshold {
        return None;
    }
    Some(PoseCorrection::new(
        CorrectionKind::Stability,
        "Hold the pose more steadily",
        1.0 - mean,
        skeleton.detected().map(|(j, _)| j).collect(),
    ))
}

/// Shoulders and hips should be level (vertical offset within each pair)
pub fn alignment(skeleton: &Skeleton, config: &CorrectionConfig) -> Option<PoseCorrection> {
    let (shoulders, hips) = pair_offsets(skeleton, |a, b| (a.y - b.y).abs())?;
    if shoulders <= config.level_threshold && hips <= config.level_threshold {
        return None;
    }
    Some(PoseCorrection::new(
        CorrectionKind::Alignment,
        "Keep your shoulders and hips level",
        shoulders.max(hips),
        PAIR_JOINTS.to_vec(),
    ))
}

/// Same pairs as [`alignment`], measured on the horizontal axis
pub fn symmetry(skeleton: &Skeleton, config: &CorrectionConfig) -> Option<PoseCorrection> {
    let (shoulders, hips) = pair_offsets(skeleton, |a, b| (a.x - b.x).abs())?;
    if shoulders <= config.symmetry_threshold && hips <= config.symmetry_threshold {
        return None;
    }
    Some(PoseCorrection::new(
        CorrectionKind::Symmetry,
        "Keep your body symmetrical",
        shoulders.max(hips),
        PAIR_JOINTS.to_vec(),
    ))
}

/// Reports the single angle furthest from its baseline target.
///
/// Only the worst angle is named even when several exceed the limit. On a
/// tie the angle that comes first in the baseline wins.
pub fn joint_deviation(
    skeleton: &Skeleton,
    baseline: &Baseline,
    config: &CorrectionConfig,
) -> Option<PoseCorrection> {
    let mut worst: Option<(JointName, f64)> = None;

    for (angle, target) in baseline.iter() {
        let spec = angle.spec();
        let Some(live) = spec.measure(skeleton) else {
            continue;
        };
        let deviation = angle_difference(live, target);
        if deviation.is_nan() {
            continue;
        }
        if worst.map_or(true, |(_, max)| deviation > max) {
            worst = Some((spec.focus_joint(), deviation));
        }
    }

    let (joint, deviation) = worst?;
    if deviation <= config.angle_deviation_deg {
        return None;
    }
    Some(PoseCorrection::new(
        CorrectionKind::Angle,
        format!("Adjust your {} angle", joint.display_name()),
        (deviation / config.angle_severity_span_deg).min(1.0),
        vec![joint],
    ))
}

fn pair_offsets(
    skeleton: &Skeleton,
    offset: impl Fn(&Keypoint, &Keypoint) -> f64,
) -> Option<(f64, f64)> {
    let left_shoulder = skeleton.get(JointName::LeftShoulder)?;
    let right_shoulder = skeleton.get(JointName::RightShoulder)?;
    let left_hip = skeleton.get(JointName::LeftHip)?;
    let right_hip = skeleton.get(JointName::RightHip)?;
    Some((
        offset(left_shoulder, right_shoulder),
        offset(left_hip, right_hip),
    ))
}
