//! One pose being practised: sample gating, scoring and rep counting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::baseline::{Baseline, PoseId};
use crate::config::Config;
use crate::correction::{CorrectionGenerator, PoseCorrection};
use crate::pose::{AngleName, JointAngleSet, Skeleton};
use crate::scoring::{AccuracyScorer, DifficultyTier, Score};

/// One accepted repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepResult {
    pub id: Uuid,
    pub pose_id: PoseId,
    pub routine_id: Uuid,
    pub reps_completed: u32,
    /// 0..=100
    pub accuracy_score: u8,
    pub timestamp: DateTime<Utc>,
    /// Per-angle accuracy, 0.0..=1.0
    #[serde(default)]
    pub joint_accuracy: BTreeMap<AngleName, f64>,
}

impl RepResult {
    pub fn new(pose_id: PoseId, routine_id: Uuid, reps_completed: u32, accuracy_score: u8, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pose_id,
            routine_id,
            reps_completed,
            accuracy_score: accuracy_score.min(100),
            timestamp,
            joint_accuracy: BTreeMap::new(),
        }
    }

    pub fn accuracy_fraction(&self) -> f64 {
        f64::from(self.accuracy_score.min(100)) / 100.0
    }
}

/// Score and corrections for one processed sample
#[derive(Debug, Clone)]
pub struct Assessment {
    pub score: Score,
    pub corrections: Vec<PoseCorrection>,
}

impl Assessment {
    pub fn score_int(&self) -> u8 {
        self.score.as_int()
    }

    /// First correction in rule order
    pub fn primary(&self) -> Option<&PoseCorrection> {
        self.corrections.first()
    }
}

#[derive(Debug, Clone)]
pub enum SampleOutcome {
    /// Arrived before the minimum interval elapsed; not scored
    Dropped,
    /// Scored below the rep threshold; the combo is broken
    Rejected(Assessment),
    /// Counted as a repetition
    Accepted(Assessment, RepResult),
}

impl SampleOutcome {
    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            SampleOutcome::Dropped => None,
            SampleOutcome::Rejected(a) | SampleOutcome::Accepted(a, _) => Some(a),
        }
    }

    pub fn rep(&self) -> Option<&RepResult> {
        match self {
            SampleOutcome::Accepted(_, rep) => Some(rep),
            _ => None,
        }
    }
}

pub struct PoseSession {
    pose: PoseId,
    routine_id: Uuid,
    baseline: Option<Arc<Baseline>>,
    tier: DifficultyTier,
    scorer: AccuracyScorer,
    corrections: CorrectionGenerator,
    min_interval: Duration,
    rep_accept_score: u8,
    last_processed: Option<Duration>,
    reps: u32,
    combo: u32,
}

impl PoseSession {
    /// `baseline` is `None` when the pose has none; every sample then
    /// scores 0. `level` picks the difficulty tier (tier 1 when absent).
    pub fn new(
        pose: PoseId,
        routine_id: Uuid,
        baseline: Option<Arc<Baseline>>,
        level: Option<u32>,
        config: &Config,
    ) -> Self {
        let tier = DifficultyTier::for_profile(level);
        tracing::info!(
            "[session] {} started (tier tolerance {}°, pass {}%, baseline: {})",
            pose,
            tier.base_tolerance,
            tier.pass_score(),
            if baseline.is_some() { "yes" } else { "missing" }
        );
        Self {
            pose,
            routine_id,
            baseline,
            tier,
            scorer: AccuracyScorer::default(),
            corrections: CorrectionGenerator::from_config(&config.corrections),
            min_interval: config.scoring.min_sample_interval(),
            rep_accept_score: config.scoring.rep_accept_score,
            last_processed: None,
            reps: 0,
            combo: 0,
        }
    }

    pub fn with_scorer(mut self, scorer: AccuracyScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_corrections(mut self, corrections: CorrectionGenerator) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn pose(&self) -> &PoseId {
        &self.pose
    }

    pub fn tier(&self) -> &DifficultyTier {
        &self.tier
    }

    /// Rescores from the next sample on at the tier for `level`.
    ///
    /// Call after a reduction levels the profile up so acceptance and XP
    /// agree on the tier.
    pub fn set_level(&mut self, level: u32) {
        let tier = DifficultyTier::for_level(level);
        if tier != self.tier {
            tracing::info!(
                "[session] {} now at tier tolerance {}° (pass {}%)",
                self.pose,
                tier.base_tolerance,
                tier.pass_score()
            );
            self.tier = tier;
        }
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    /// Consecutive accepted reps since the last rejected sample
    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Scores one skeleton.
    ///
    /// `at` is a monotonic sample time (session clock or detector
    /// timestamp); `timestamp` stamps the rep if one is produced. Samples
    /// closer than the minimum interval to the last processed one, or older
    /// than it, are dropped.
    pub fn process(&mut self, skeleton: &Skeleton, at: Duration, timestamp: DateTime<Utc>) -> SampleOutcome {
        if let Some(last) = self.last_processed {
            if at < last + self.min_interval {
                return SampleOutcome::Dropped;
            }
        }
        self.last_processed = Some(at);

        let assessment = self.assess(skeleton);
        let score = assessment.score_int();
        if score < self.rep_accept_score {
            if self.combo > 0 {
                tracing::debug!("[session] combo of {} broken at score {}", self.combo, score);
            }
            self.combo = 0;
            return SampleOutcome::Rejected(assessment);
        }

        self.reps += 1;
        self.combo += 1;
        let mut rep = RepResult::new(self.pose.clone(), self.routine_id, self.reps, score, timestamp);
        if let Some(card) = assessment.score.card() {
            rep.joint_accuracy = card
                .joints
                .iter()
                .map(|j| (j.angle, (j.score / 100.0).clamp(0.0, 1.0)))
                .collect();
        }
        tracing::debug!("[session] rep {} of {} at score {}", self.reps, self.pose, score);
        SampleOutcome::Accepted(assessment, rep)
    }

    /// Score and corrections without gating or rep bookkeeping
    pub fn assess(&self, skeleton: &Skeleton) -> Assessment {
        let baseline = self.baseline.as_deref();
        let score = match baseline {
            Some(b) => self.scorer.score(&JointAngleSet::from_skeleton(skeleton), b, &self.tier),
            None => Score::Unavailable,
        };
        let corrections = self.corrections.generate(skeleton, baseline, Some(&self.pose));
        Assessment { score, corrections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{JointName, Keypoint};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn upright() -> Skeleton {
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

    fn session_for(skeleton: &Skeleton) -> PoseSession {
        let baseline: Baseline = JointAngleSet::from_skeleton(skeleton).iter().collect();
        PoseSession::new(
            PoseId::from(PoseId::FULL_ROLL_UP),
            Uuid::new_v4(),
            Some(Arc::new(baseline)),
            Some(1),
            &Config::default(),
        )
    }

    #[test]
    fn test_matching_pose_counts_rep() {
        let skeleton = upright();
        let mut session = session_for(&skeleton);
        let outcome = session.process(&skeleton, ms(0), Utc::now());
        let rep = outcome.rep().unwrap();
        assert_eq!(rep.accuracy_score, 100);
        assert_eq!(rep.reps_completed, 1);
        assert!(rep.joint_accuracy.values().all(|v| (*v - 1.0).abs() < 1e-9));
        assert!(!rep.joint_accuracy.is_empty());
        assert!(outcome.assessment().unwrap().corrections.is_empty());
        assert_eq!(session.combo(), 1);
    }

    #[test]
    fn test_samples_inside_interval_dropped() {
        let skeleton = upright();
        let mut session = session_for(&skeleton);
        assert!(session.process(&skeleton, ms(1000), Utc::now()).rep().is_some());
        assert!(matches!(session.process(&skeleton, ms(1100), Utc::now()), SampleOutcome::Dropped));
        assert!(matches!(session.process(&skeleton, ms(900), Utc::now()), SampleOutcome::Dropped));
        assert!(session.process(&skeleton, ms(1200), Utc::now()).rep().is_some());
        assert_eq!(session.reps(), 2);
    }

    #[test]
    fn test_low_score_rejected_and_breaks_combo() {
        let skeleton = upright();
        let mut session = session_for(&skeleton);
        session.process(&skeleton, ms(0), Utc::now());
        session.process(&skeleton, ms(200), Utc::now());
        assert_eq!(session.combo(), 2);

        // knees swung out sideways: hip angles far from baseline
        let bent = skeleton
            .clone()
            .with(JointName::LeftKnee, Keypoint::new(0.85, 0.50, 0.95))
            .with(JointName::RightKnee, Keypoint::new(0.15, 0.50, 0.95));
        let outcome = session.process(&bent, ms(400), Utc::now());
        assert!(matches!(outcome, SampleOutcome::Rejected(_)));
        assert_eq!(session.combo(), 0);
        assert_eq!(session.reps(), 2);
        let primary = outcome.assessment().unwrap().primary().unwrap();
        assert_eq!(primary.kind, crate::correction::CorrectionKind::Angle);
    }

    #[test]
    fn test_missing_baseline_scores_zero() {
        let mut session = PoseSession::new(
            PoseId::from("Teaser"),
            Uuid::new_v4(),
            None,
            None,
            &Config::default(),
        );
        let outcome = session.process(&upright(), ms(0), Utc::now());
        let assessment = outcome.assessment().unwrap();
        assert_eq!(assessment.score_int(), 0);
        assert!(!assessment.score.is_available());
        assert!(matches!(outcome, SampleOutcome::Rejected(_)));
    }

    #[test]
    fn test_empty_skeleton_gives_zero_and_no_corrections() {
        let mut session = session_for(&upright());
        let outcome = session.process(&Skeleton::new(), ms(0), Utc::now());
        let assessment = outcome.assessment().unwrap();
        assert_eq!(assessment.score_int(), 0);
        assert!(assessment.corrections.is_empty());
    }

    #[test]
    fn test_tier_follows_level() {
        let session = PoseSession::new(PoseId::from("x"), Uuid::new_v4(), None, Some(7), &Config::default());
        assert_eq!(session.tier().base_tolerance, 10.0);
    }

    #[test]
    fn test_level_up_tightens_scoring() {
        use crate::config::ProgressionConfig;
        use crate::progression::{AchievementCatalog, ProgressionEngine, UserProfile};
        use crate::scoring::{JointWeight, JointWeights};

        // one angle, 5 degrees off: 75 at tier 1, 66.7 * 0.8 at tier 2
        let skeleton = upright();
        let spine = JointAngleSet::from_skeleton(&skeleton).get(AngleName::SpineAngle).unwrap();
        let baseline = Baseline::new().with(AngleName::SpineAngle, spine + 5.0);
        let weights = JointWeights::empty().with(AngleName::SpineAngle, JointWeight::new("Spine", 1.0, 15.0));

        let mut profile = UserProfile::new("a");
        profile.xp = 95;
        profile.level = 1;
        let mut session = PoseSession::new(
            PoseId::from(PoseId::FULL_ROLL_UP),
            Uuid::new_v4(),
            Some(Arc::new(baseline)),
            Some(profile.level),
            &Config::default(),
        )
        .with_scorer(AccuracyScorer::new(weights));

        let outcome = session.process(&skeleton, ms(0), Utc::now());
        let rep = outcome.rep().unwrap().clone();
        assert_eq!(rep.accuracy_score, 75);

        let engine = ProgressionEngine::new(ProgressionConfig::default(), AchievementCatalog::new(vec![]));
        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let reduction = engine.reduce(&profile, &[], &rep, today);
        assert!(reduction.leveled_up);
        session.set_level(reduction.profile.level);
        assert_eq!(session.tier().base_tolerance, 15.0);

        let outcome = session.process(&skeleton, ms(200), Utc::now());
        assert!(matches!(outcome, SampleOutcome::Rejected(_)));
        assert_eq!(outcome.assessment().unwrap().score_int(), 53);
    }

    #[test]
    fn test_rep_result_json_shape() {
        let rep = RepResult::new(PoseId::from("FullRollUp"), Uuid::nil(), 3, 87, Utc::now());
        let json = serde_json::to_value(&rep).unwrap();
        assert_eq!(json["pose_id"], "FullRollUp");
        assert_eq!(json["accuracy_score"], 87);
        let back: RepResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, rep);
    }
}
