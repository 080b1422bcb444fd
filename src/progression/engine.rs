use chrono::NaiveDate;

use super::achievement::{Achievement, AchievementCatalog};
use super::metrics::{mean, ExerciseMetrics};
use super::profile::{level_for_xp, RoutineKind, UserProfile};
use super::xp::{carried_streak, next_streak, xp_gain, XpContext};
use crate::config::ProgressionConfig;
use crate::scoring::DifficultyTier;
use crate::session::RepResult;

/// Result of folding one rep into a profile
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub profile: UserProfile,
    /// XP from the rep itself
    pub xp_gained: u64,
    /// XP from achievements unlocked by this rep
    pub bonus_xp: u64,
    pub unlocked: Vec<Achievement>,
    pub new_routines: Vec<RoutineKind>,
    pub completed_goals: usize,
    pub leveled_up: bool,
}

/// Pure reducer from (profile, history, rep) to a new profile.
///
/// Writes to one profile must be serialized by the caller; see
/// [`super::ProfileWriter`].
#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
    config: ProgressionConfig,
    catalog: AchievementCatalog,
}

impl ProgressionEngine {
    pub fn new(config: ProgressionConfig, catalog: AchievementCatalog) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AchievementCatalog {
        &self.catalog
    }

    /// Folds `event` into `profile`.
    ///
    /// `history` holds the reps already folded in, oldest first, and must
    /// not contain `event`. `today` is the day the rep counts towards for
    /// the streak.
    pub fn reduce(
        &self,
        profile: &UserProfile,
        history: &[RepResult],
        event: &RepResult,
        today: NaiveDate,
    ) -> Reduction {
        let mut next = profile.clone();
        let starting_level = level_for_xp(profile.xp);

        // 1. xp for the rep, at the tier of the level held before it;
        // sessions follow level-ups through PoseSession::set_level
        let ctx = XpContext {
            accuracy: event.accuracy_fraction(),
            rolling_accuracy: self.rolling_accuracy(history, event),
            streak: carried_streak(profile.streak_count, profile.last_active_date, today),
            tier: DifficultyTier::for_level(starting_level),
        };
        let xp_gained = xp_gain(&ctx, &self.config);
        next.xp = next.xp.saturating_add(xp_gained);

        // 2. level is derived, never stored independently
        next.level = level_for_xp(next.xp);

        // 3. streak
        next.streak_count = next_streak(profile.streak_count, profile.last_active_date, today);
        next.best_streak = next.best_streak.max(next.streak_count);
        if profile.last_active_date.map_or(true, |last| today > last) {
            next.last_active_date = Some(today);
        }

        // 4. achievements, judged once on the updated state
        let metrics = ExerciseMetrics::from_history(history.iter().chain(std::iter::once(event)), next.streak_count);
        let unlocked = self.unlock_achievements(&mut next, &metrics);
        let bonus_xp: u64 = unlocked.iter().map(|a| a.xp_reward).sum();
        next.level = level_for_xp(next.xp);

        let new_routines = unlock_routines(&mut next);
        let mut completed_goals = 0;
        for goal in &mut next.goals {
            if goal.record_rep(today) {
                completed_goals += 1;
            }
        }

        let leveled_up = next.level > starting_level;
        if leveled_up {
            tracing::info!("[progression] level {} -> {} at {} xp", starting_level, next.level, next.xp);
        }
        for a in &unlocked {
            tracing::info!("[progression] achievement unlocked: {} (+{} xp)", a.name, a.xp_reward);
        }

        Reduction {
            profile: next,
            xp_gained,
            bonus_xp,
            unlocked,
            new_routines,
            completed_goals,
            leveled_up,
        }
    }

    /// Unlocks every catalog entry the metrics satisfy and that `profile`
    /// does not hold yet, adding its reward to the profile's xp. Calling it
    /// again with the same metrics unlocks nothing.
    pub fn unlock_achievements(&self, profile: &mut UserProfile, metrics: &ExerciseMetrics) -> Vec<Achievement> {
        let mut unlocked = Vec::new();
        for achievement in self.catalog.iter() {
            if profile.has_achievement(&achievement.id) || !achievement.requirement.is_met(metrics) {
                continue;
            }
            profile.achievements.insert(achievement.id.clone());
            profile.xp = profile.xp.saturating_add(achievement.xp_reward);
            unlocked.push(achievement.clone());
        }
        profile.level = level_for_xp(profile.xp);
        unlocked
    }

    /// Mean accuracy over the last `consistency_window` reps, `event` included
    fn rolling_accuracy(&self, history: &[RepResult], event: &RepResult) -> f64 {
        let window = self.config.consistency_window.max(1);
        let earlier = history.len().saturating_sub(window - 1);
        let fractions: Vec<f64> = history[earlier..]
            .iter()
            .chain(std::iter::once(event))
            .map(RepResult::accuracy_fraction)
            .collect();
        mean(&fractions).unwrap_or(0.0)
    }
}

/// Adds routines the profile's level now allows; never removes any
fn unlock_routines(profile: &mut UserProfile) -> Vec<RoutineKind> {
    let mut added = Vec::new();
    for routine in RoutineKind::ALL {
        if routine.unlock_level() <= profile.level && profile.unlocked_routines.insert(routine) {
            added.push(routine);
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::PoseId;
    use crate::progression::profile::Goal;
    use chrono::{Days, Utc};
    use uuid::Uuid;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + Days::new(n)
    }

    fn rep(pose: &str, score: u8) -> RepResult {
        RepResult::new(PoseId::from(pose), Uuid::nil(), 1, score, Utc::now())
    }

    fn no_achievements() -> ProgressionEngine {
        ProgressionEngine::new(ProgressionConfig::default(), AchievementCatalog::new(vec![]))
    }

    #[test]
    fn test_first_rep() {
        let engine = ProgressionEngine::default();
        let r = engine.reduce(&UserProfile::new("a"), &[], &rep("Teaser", 80), day(0));
        assert_eq!(r.xp_gained, 8);
        assert_eq!(r.profile.streak_count, 1);
        assert_eq!(r.profile.best_streak, 1);
        assert_eq!(r.profile.last_active_date, Some(day(0)));
        let ids: Vec<&str> = r.unlocked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first_steps"]);
        assert_eq!(r.bonus_xp, 10);
        assert_eq!(r.profile.xp, 18);
        assert_eq!(r.profile.level, 1);
    }

    #[test]
    fn test_level_always_derived_from_xp() {
        let engine = ProgressionEngine::default();
        let mut profile = UserProfile::new("a");
        let mut history = Vec::new();
        for i in 0..60 {
            let event = rep("FullRollUp", 95);
            let r = engine.reduce(&profile, &history, &event, day(i / 3));
            assert_eq!(r.profile.level, level_for_xp(r.profile.xp));
            assert!(r.profile.xp >= profile.xp);
            assert!(r.profile.level >= profile.level);
            assert!(r.profile.achievements.is_superset(&profile.achievements));
            profile = r.profile;
            history.push(event);
        }
        assert!(profile.level > 1);
    }

    #[test]
    fn test_streak_next_day_and_gap() {
        let engine = no_achievements();
        let first = engine.reduce(&UserProfile::new("a"), &[], &rep("A", 80), day(10)).profile;
        let next_day = engine.reduce(&first, &[], &rep("A", 80), day(11)).profile;
        assert_eq!(next_day.streak_count, 2);

        let after_gap = engine.reduce(&first, &[], &rep("A", 80), day(13)).profile;
        assert_eq!(after_gap.streak_count, 1);
        assert_eq!(after_gap.last_active_date, Some(day(13)));
    }

    #[test]
    fn test_same_day_keeps_streak() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.streak_count = 4;
        profile.best_streak = 6;
        profile.last_active_date = Some(day(3));
        let r = engine.reduce(&profile, &[], &rep("A", 80), day(3));
        assert_eq!(r.profile.streak_count, 4);
        assert_eq!(r.profile.best_streak, 6);
    }

    #[test]
    fn test_streak_bonus_uses_streak_before_rep() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.streak_count = 2;
        profile.last_active_date = Some(day(0));
        // 10 * 0.8 * 1.2^2 = 11.52
        let r = engine.reduce(&profile, &[], &rep("A", 80), day(1));
        assert_eq!(r.xp_gained, 12);
        assert_eq!(r.profile.streak_count, 3);
    }

    #[test]
    fn test_streak_bonus_lost_after_gap() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.streak_count = 10;
        profile.best_streak = 10;
        profile.last_active_date = Some(day(0));
        let r = engine.reduce(&profile, &[], &rep("A", 80), day(30));
        assert_eq!(r.xp_gained, 8);
        assert_eq!(r.profile.streak_count, 1);
        assert_eq!(r.profile.best_streak, 10);
    }

    #[test]
    fn test_consistency_window() {
        let engine = no_achievements();
        let history: Vec<RepResult> = vec![rep("A", 50), rep("A", 90), rep("A", 90), rep("A", 90), rep("A", 90)];
        // window of 5: four 0.9s plus the event 0.9 -> bonus
        let r = engine.reduce(&UserProfile::new("a"), &history, &rep("A", 90), day(0));
        assert_eq!(r.xp_gained, 14); // round(10 * 0.9 * 1.5) = 13.5 -> 14

        // two 0.5s inside the window pull the mean to 0.74
        let history = vec![rep("A", 50), rep("A", 50), rep("A", 90), rep("A", 90)];
        let r = engine.reduce(&UserProfile::new("a"), &history, &rep("A", 90), day(0));
        assert_eq!(r.xp_gained, 9);
    }

    #[test]
    fn test_achievement_unlock_is_idempotent() {
        let engine = ProgressionEngine::default();
        let mut profile = UserProfile::new("a");
        let metrics = ExerciseMetrics {
            streak: 3,
            total_reps: 1,
            ..ExerciseMetrics::default()
        };
        let first = engine.unlock_achievements(&mut profile, &metrics);
        let xp_after_first = profile.xp;
        let second = engine.unlock_achievements(&mut profile, &metrics);

        let ids: Vec<&str> = first.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first_steps", "three_day_streak"]);
        assert_eq!(xp_after_first, 35);
        assert!(second.is_empty());
        assert_eq!(profile.xp, 35);
    }

    #[test]
    fn test_reduce_twice_awards_achievement_once() {
        let engine = ProgressionEngine::default();
        let event = rep("A", 70);
        let once = engine.reduce(&UserProfile::new("a"), &[], &event, day(0));
        let twice = engine.reduce(&once.profile, &[event.clone()], &rep("A", 70), day(0));
        assert_eq!(once.unlocked.len(), 1);
        assert!(twice.unlocked.is_empty());
        assert_eq!(twice.bonus_xp, 0);
    }

    #[test]
    fn test_achievement_xp_can_level_up() {
        let catalog = AchievementCatalog::new(vec![Achievement::new(
            "big",
            "Big",
            "",
            crate::progression::achievement::Requirement::default(),
            95,
        )]);
        let engine = ProgressionEngine::new(ProgressionConfig::default(), catalog);
        let r = engine.reduce(&UserProfile::new("a"), &[], &rep("A", 50), day(0));
        assert_eq!(r.profile.xp, 100);
        assert_eq!(r.profile.level, 2);
        assert!(r.leveled_up);
        assert_eq!(r.new_routines, vec![RoutineKind::Core]);
    }

    #[test]
    fn test_routines_follow_level() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.xp = 1_599;
        profile.level = level_for_xp(profile.xp);
        let r = engine.reduce(&profile, &[], &rep("A", 100), day(0));
        assert_eq!(r.profile.level, 5);
        assert_eq!(
            r.new_routines,
            vec![RoutineKind::Core, RoutineKind::Stretch, RoutineKind::ArmsBack, RoutineKind::LegsGlutes]
        );
        let again = engine.reduce(&r.profile, &[], &rep("A", 100), day(0));
        assert!(again.new_routines.is_empty());
    }

    #[test]
    fn test_only_finished_goals_counted() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.goals.push(Goal::new("one rep", 1, None));
        profile.goals.push(Goal::new("three reps", 3, None));
        profile.goals.push(Goal::new("overdue", 1, Some(day(0))));
        let r = engine.reduce(&profile, &[], &rep("A", 80), day(1));
        assert_eq!(r.completed_goals, 1);
        assert!(r.profile.goals[0].is_completed);
        assert_eq!(r.profile.goals[1].progress, 1);
        assert!(!r.profile.goals[2].is_completed);

        let again = engine.reduce(&r.profile, &[], &rep("A", 80), day(1));
        assert_eq!(again.completed_goals, 0);
        assert_eq!(again.profile.goals[1].progress, 2);
    }

    #[test]
    fn test_goal_completion() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.goals.push(Goal::new("one rep", 1, None));
        let r = engine.reduce(&profile, &[], &rep("A", 80), day(0));
        assert_eq!(r.completed_goals, 1);
        assert!(r.profile.goals[0].is_completed);
    }

    #[test]
    fn test_tier_from_level() {
        let engine = no_achievements();
        let mut profile = UserProfile::new("a");
        profile.xp = 400;
        profile.level = 3;
        // tier 3: 10 * 0.8 * 2.0 * 1.5
        let r = engine.reduce(&profile, &[], &rep("A", 80), day(0));
        assert_eq!(r.xp_gained, 24);
    }
}
