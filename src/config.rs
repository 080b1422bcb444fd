use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub corrections: CorrectionConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub baselines: BaselineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Samples closer together than this are dropped (ms)
    #[serde(default = "default_min_sample_interval_ms")]
    pub min_sample_interval_ms: u64,
    /// Integer score at or above which a sample counts as a repetition
    #[serde(default = "default_rep_accept_score")]
    pub rep_accept_score: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrectionConfig {
    /// Mean joint confidence below which the pose is reported unstable
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,
    /// Max vertical offset between paired joints (normalized units)
    #[serde(default = "default_pair_threshold")]
    pub level_threshold: f64,
    /// Max horizontal offset between paired joints (normalized units)
    #[serde(default = "default_pair_threshold")]
    pub symmetry_threshold: f64,
    /// Worst-joint deviation that triggers an angle correction (degrees)
    #[serde(default = "default_angle_deviation_deg")]
    pub angle_deviation_deg: f64,
    /// Deviation at which angle severity saturates at 1.0 (degrees)
    #[serde(default = "default_angle_severity_span_deg")]
    pub angle_severity_span_deg: f64,
    /// Max neck/root horizontal offset for spine checks
    #[serde(default = "default_pair_threshold")]
    pub spine_offset_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_base_xp")]
    pub base_xp: f64,
    /// Number of most recent reps averaged for the consistency bonus
    #[serde(default = "default_consistency_window")]
    pub consistency_window: usize,
    #[serde(default = "default_consistency_bonus_threshold")]
    pub consistency_bonus_threshold: f64,
    #[serde(default = "default_consistency_bonus")]
    pub consistency_bonus: f64,
    #[serde(default = "default_streak_multiplier")]
    pub streak_multiplier: f64,
    /// Streak days beyond this stop growing the streak bonus
    #[serde(default = "default_streak_bonus_cap")]
    pub streak_bonus_cap: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_profile_path")]
    pub profile_path: PathBuf,
    #[serde(default = "default_rep_log_path")]
    pub rep_log_path: PathBuf,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BaselineConfig {
    /// Directory holding `<pose>_baseline_angles.json` files
    #[serde(default = "default_baseline_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_min_sample_interval_ms() -> u64 { 200 }
fn default_rep_accept_score() -> u8 { 60 }
fn default_stability_threshold() -> f64 { 0.8 }
fn default_pair_threshold() -> f64 { 0.1 }
fn default_angle_deviation_deg() -> f64 { 15.0 }
fn default_angle_severity_span_deg() -> f64 { 45.0 }
fn default_base_xp() -> f64 { 10.0 }
fn default_consistency_window() -> usize { 5 }
fn default_consistency_bonus_threshold() -> f64 { 0.8 }
fn default_consistency_bonus() -> f64 { 1.5 }
fn default_streak_multiplier() -> f64 { 1.2 }
fn default_streak_bonus_cap() -> u32 { 10 }
fn default_profile_path() -> PathBuf { PathBuf::from("profile.json") }
fn default_rep_log_path() -> PathBuf { PathBuf::from("reps.jsonl") }
fn default_retry_delay_ms() -> u64 { 500 }
fn default_max_retry_delay_ms() -> u64 { 8000 }
fn default_baseline_dir() -> PathBuf { PathBuf::from("baselines") }
fn default_log_level() -> String { "info".to_string() }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_sample_interval_ms: default_min_sample_interval_ms(),
            rep_accept_score: default_rep_accept_score(),
        }
    }
}

impl ScoringConfig {
    pub fn min_sample_interval(&self) -> Duration {
        Duration::from_millis(self.min_sample_interval_ms)
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            stability_threshold: default_stability_threshold(),
            level_threshold: default_pair_threshold(),
            symmetry_threshold: default_pair_threshold(),
            angle_deviation_deg: default_angle_deviation_deg(),
            angle_severity_span_deg: default_angle_severity_span_deg(),
            spine_offset_threshold: default_pair_threshold(),
        }
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            consistency_window: default_consistency_window(),
            consistency_bonus_threshold: default_consistency_bonus_threshold(),
            consistency_bonus: default_consistency_bonus(),
            streak_multiplier: default_streak_multiplier(),
            streak_bonus_cap: default_streak_bonus_cap(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            profile_path: default_profile_path(),
            rep_log_path: default_rep_log_path(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

impl PersistenceConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms.max(self.retry_delay_ms))
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            dir: default_baseline_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Falls back to defaults when the file is missing (quietly) or
    /// malformed (with a warning)
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        if !path.as_ref().exists() {
            tracing::debug!("[config] {} not found; using defaults", path.as_ref().display());
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[config] {e:#}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scoring.min_sample_interval_ms, 200);
        assert_eq!(config.scoring.rep_accept_score, 60);
        assert_eq!(config.corrections.stability_threshold, 0.8);
        assert_eq!(config.corrections.angle_deviation_deg, 15.0);
        assert_eq!(config.progression.base_xp, 10.0);
        assert_eq!(config.progression.streak_multiplier, 1.2);
        assert_eq!(config.baselines.dir, PathBuf::from("baselines"));
    }

    #[test]
    fn test_partial_section() {
        let config: Config = toml::from_str(
            r#"
            [corrections]
            stability_threshold = 0.6

            [progression]
            streak_bonus_cap = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.corrections.stability_threshold, 0.6);
        assert_eq!(config.corrections.level_threshold, 0.1);
        assert_eq!(config.progression.streak_bonus_cap, 3);
        assert_eq!(config.progression.consistency_window, 5);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/pose-coach.toml");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose-coach.toml");
        fs::write(&path, "[scoring\nrep_accept_score = ").unwrap();
        assert!(Config::load(&path).is_err());
        let config = Config::load_or_default(&path);
        assert_eq!(config.scoring.rep_accept_score, 60);

        fs::write(&path, "[scoring]\nrep_accept_score = 70\n").unwrap();
        assert_eq!(Config::load_or_default(&path).scoring.rep_accept_score, 70);
    }

    #[test]
    fn test_max_retry_delay_never_below_base() {
        let cfg = PersistenceConfig {
            retry_delay_ms: 1000,
            max_retry_delay_ms: 10,
            ..PersistenceConfig::default()
        };
        assert_eq!(cfg.max_retry_delay(), Duration::from_millis(1000));
    }
}
