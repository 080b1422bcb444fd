use chrono::NaiveDate;

use crate::config::ProgressionConfig;
use crate::scoring::DifficultyTier;

/// Inputs to one XP award
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XpContext {
    /// Accuracy of the rep, 0..=1
    pub accuracy: f64,
    /// Mean accuracy over the rolling window including this rep
    pub rolling_accuracy: f64,
    /// Streak this rep builds on, see [`carried_streak`]
    pub streak: u32,
    pub tier: DifficultyTier,
}

/// XP earned by one rep.
///
/// `base * accuracy * tier multiplier * consistency bonus * streak bonus *
/// difficulty factor`, computed in floating point and rounded once. The
/// streak exponent stops growing at `streak_bonus_cap`.
pub fn xp_gain(ctx: &XpContext, config: &ProgressionConfig) -> u64 {
    let accuracy = if ctx.accuracy.is_nan() { 0.0 } else { ctx.accuracy.clamp(0.0, 1.0) };
    let consistency = if ctx.rolling_accuracy > config.consistency_bonus_threshold {
        config.consistency_bonus
    } else {
        1.0
    };
    let exponent = ctx.streak.min(config.streak_bonus_cap);
    let streak = config.streak_multiplier.powi(exponent as i32);

    let xp = config.base_xp
        * accuracy
        * ctx.tier.xp_multiplier
        * consistency
        * streak
        * ctx.tier.difficulty_factor();
    if xp.is_finite() && xp > 0.0 {
        xp.round() as u64
    } else {
        0
    }
}

/// Streak after activity on `today`.
///
/// Same day (or a clock that went backwards) keeps the streak, the next day
/// extends it, anything else starts over at 1.
pub fn next_streak(current: u32, last_active: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(last) = last_active else {
        return 1;
    };
    match (today - last).num_days() {
        gap if gap <= 0 => current.max(1),
        1 => current.saturating_add(1),
        _ => 1,
    }
}

/// Streak a rep on `today` builds on for its bonus.
///
/// The current streak while it is still alive (same or next day); 0 once a
/// gap has broken it or when there is no prior activity.
pub fn carried_streak(current: u32, last_active: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_active {
        Some(last) if (today - last).num_days() <= 1 => current,
        _ => 0,
    }
}
