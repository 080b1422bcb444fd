use std::collections::HashMap;

use super::{CorrectionKind, PoseCorrection};
use crate::baseline::PoseId;
use crate::config::CorrectionConfig;
use crate::pose::{JointName, Skeleton};

/// Extra check that only applies to one pose
pub trait PoseRule: Send + Sync {
    fn check(&self, skeleton: &Skeleton, config: &CorrectionConfig) -> Option<PoseCorrection>;
}

/// Neck should stay above the root while rolling up
pub struct SpineStraightness;

impl PoseRule for SpineStraightness {
    fn check(&self, skeleton: &Skeleton, config: &CorrectionConfig) -> Option<PoseCorrection> {
        let neck = skeleton.get(JointName::Neck)?;
        let root = skeleton.get(JointName::Root)?;
        let offset = (neck.x - root.x).abs();
        if offset <= config.spine_offset_threshold {
            return None;
        }
        Some(PoseCorrection::new(
            CorrectionKind::Alignment,
            "Keep your spine straight during the roll up",
            offset,
            vec![JointName::Neck, JointName::Root],
        ))
    }
}

/// Pose-keyed rules; poses without an entry get no extra check
pub struct PoseRules {
    rules: HashMap<PoseId, Box<dyn PoseRule>>,
}

impl PoseRules {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn register(&mut self, pose: impl Into<PoseId>, rule: impl PoseRule + 'static) {
        self.rules.insert(pose.into(), Box::new(rule));
    }

    pub fn check(
        &self,
        pose: &PoseId,
        skeleton: &Skeleton,
        config: &CorrectionConfig,
    ) -> Option<PoseCorrection> {
        self.rules.get(pose)?.check(skeleton, config)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for PoseRules {
    fn default() -> Self {
        let mut rules = Self::empty();
        rules.register(PoseId::FULL_ROLL_UP, SpineStraightness);
        rules
    }
}
