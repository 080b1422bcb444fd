use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Level reached with `xp` experience: `floor(sqrt(xp / 100)) + 1`
pub fn level_for_xp(xp: u64) -> u32 {
    // integer sqrt avoids f64 rounding at perfect squares
    let ratio = xp / 100;
    let mut root = (ratio as f64).sqrt() as u64;
    while root * root > ratio {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= ratio {
        root += 1;
    }
    u32::try_from(root).unwrap_or(u32::MAX - 1) + 1
}

/// Routine families, unlocked by level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutineKind {
    Standing,
    Core,
    Stretch,
    ArmsBack,
    LegsGlutes,
}

impl RoutineKind {
    pub const ALL: [RoutineKind; 5] = [
        RoutineKind::Standing,
        RoutineKind::Core,
        RoutineKind::Stretch,
        RoutineKind::ArmsBack,
        RoutineKind::LegsGlutes,
    ];

    pub fn unlock_level(&self) -> u32 {
        match self {
            RoutineKind::Standing => 1,
            RoutineKind::Core => 2,
            RoutineKind::Stretch => 3,
            RoutineKind::ArmsBack => 4,
            RoutineKind::LegsGlutes => 5,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoutineKind::Standing => "Standing",
            RoutineKind::Core => "Core",
            RoutineKind::Stretch => "Stretch",
            RoutineKind::ArmsBack => "Arms & Back",
            RoutineKind::LegsGlutes => "Legs & Glutes",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A user-set target counted in repetitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub description: String,
    pub target: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_completed: bool,
}

impl Goal {
    pub fn new(description: impl Into<String>, target: u32, due_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            target,
            progress: 0,
            due_date,
            is_completed: false,
        }
    }

    /// Counts one rep done on `day`; overdue and completed goals are frozen
    pub fn record_rep(&mut self, day: NaiveDate) -> bool {
        if self.is_completed || self.due_date.is_some_and(|due| day > due) {
            return false;
        }
        self.progress = self.progress.saturating_add(1);
        if self.progress >= self.target {
            self.is_completed = true;
            return true;
        }
        false
    }
}

/// Persistent progression state.
///
/// Only [`super::ProgressionEngine`] produces new profiles; `level` is always
/// derived from `xp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub level: u32,
    pub xp: u64,
    #[serde(default)]
    pub streak_count: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
    /// Unlocked achievement ids
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    #[serde(default = "default_routines")]
    pub unlocked_routines: BTreeSet<RoutineKind>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

fn default_routines() -> BTreeSet<RoutineKind> {
    BTreeSet::from([RoutineKind::Standing])
}

impl UserProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            level: 1,
            xp: 0,
            streak_count: 0,
            best_streak: 0,
            last_active_date: None,
            achievements: BTreeSet::new(),
            unlocked_routines: default_routines(),
            goals: Vec::new(),
        }
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.contains(id)
    }

    pub fn is_unlocked(&self, routine: RoutineKind) -> bool {
        self.unlocked_routines.contains(&routine)
    }

    /// Profiles loaded from disk may carry a stale level; the xp wins.
    pub fn normalized(mut self) -> Self {
        let level = level_for_xp(self.xp);
        if level != self.level {
            tracing::warn!("[profile] stored level {} does not match xp {}; using {}", self.level, self.xp, level);
            self.level = level;
        }
        self.unlocked_routines.insert(RoutineKind::Standing);
        self
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new("")
    }
}
