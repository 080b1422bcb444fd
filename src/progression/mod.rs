//! Experience, levels, streaks and achievements
//!
//! # Components
//! - `profile.rs`: the persisted user profile and the level curve
//! - `xp.rs`: per-rep XP award and streak stepping
//! - `metrics.rs`: aggregates over the rep history
//! - `achievement.rs`: achievement catalog and requirements
//! - `engine.rs`: pure reducer folding a rep into a profile
//! - `writer.rs`: single-writer actor with background persistence
//! - `persist.rs`: profile store and rep log collaborators

pub mod achievement;
pub mod engine;
pub mod metrics;
pub mod persist;
pub mod profile;
pub mod writer;
pub mod xp;

pub use achievement::{Achievement, AchievementCatalog, Requirement};
pub use engine::{ProgressionEngine, Reduction};
pub use metrics::ExerciseMetrics;
pub use persist::{load_rep_history, JsonFileProfileStore, JsonLinesRepSink, NullSink, ProfileStore, RepResultSink};
pub use profile::{level_for_xp, Goal, RoutineKind, UserProfile};
pub use writer::{ProfileWriter, WriterShutdown};
pub use xp::{carried_streak, next_streak, xp_gain, XpContext};
