//! Replays recorded skeleton samples through a pose session and folds the
//! accepted reps into the stored profile.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};
use uuid::Uuid;

use pose_coach::baseline::{CachedBaselineStore, DirBaselineStore, PoseId};
use pose_coach::config::{Config, LoggingConfig};
use pose_coach::pose::SkeletonSample;
use pose_coach::progression::{
    load_rep_history, AchievementCatalog, JsonFileProfileStore, JsonLinesRepSink, ProfileStore,
    ProfileWriter, ProgressionEngine, UserProfile,
};
use pose_coach::session::{PoseSession, SampleOutcome};

const DEFAULT_CONFIG_PATH: &str = "pose-coach.toml";

#[derive(Parser)]
#[command(name = "pose-coach")]
#[command(about = "Score recorded exercise poses and update the progression profile")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Config file (defaults apply when omitted and pose-coach.toml is absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pose to score against
    #[arg(long, default_value = PoseId::FULL_ROLL_UP)]
    pose: String,

    /// Skeleton samples, one JSON object per line
    #[arg(long)]
    samples: PathBuf,

    /// Routine id recorded on each rep (random when omitted)
    #[arg(long)]
    routine: Option<Uuid>,

    /// Day the reps count towards for the streak (YYYY-MM-DD, default today)
    #[arg(long)]
    today: Option<NaiveDate>,
}

fn read_samples(path: &Path) -> Result<Vec<SkeletonSample>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut samples = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SkeletonSample>(&line) {
            Ok(sample) => samples.push(sample),
            Err(e) => tracing::warn!("[replay] {}:{}: skipping bad sample: {}", path.display(), i + 1, e),
        }
    }
    Ok(samples)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the config's level replaces the default once loaded
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new(LoggingConfig::default().level)));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();

    // an explicit --config must load
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(DEFAULT_CONFIG_PATH),
    };
    if !from_env {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.logging.level)) {
            tracing::warn!("[config] log level {:?} not applied: {}", config.logging.level, e);
        }
    }
    tracing::info!("pose-coach ({})", env!("GIT_VERSION"));

    let pose = PoseId::new(cli.pose);
    let routine_id = cli.routine.unwrap_or_else(Uuid::new_v4);
    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());

    let baselines = CachedBaselineStore::new(DirBaselineStore::new(&config.baselines.dir));
    let baseline = baselines.get_or_log(&pose);

    let store = JsonFileProfileStore::new(&config.persistence.profile_path);
    let profile = store
        .load()
        .with_context(|| format!("failed to load profile {}", store.path().display()))?
        .unwrap_or_default();
    let history = load_rep_history(&config.persistence.rep_log_path)?;
    let sink = JsonLinesRepSink::open(&config.persistence.rep_log_path)
        .with_context(|| format!("failed to open rep log {}", config.persistence.rep_log_path.display()))?;
    tracing::info!(
        "[replay] profile level {} ({} xp, streak {}), {} reps on record",
        profile.level,
        profile.xp,
        profile.streak_count,
        history.len()
    );

    let mut session = PoseSession::new(pose.clone(), routine_id, baseline, Some(profile.level), &config);
    let writer = ProfileWriter::spawn(
        ProgressionEngine::new(config.progression.clone(), AchievementCatalog::default()),
        profile,
        history,
        Arc::new(store),
        Arc::new(sink),
        &config.persistence,
    );

    let samples = read_samples(&cli.samples)?;
    let mut dropped = 0usize;
    for sample in &samples {
        let at = Duration::from_millis(sample.timestamp_ms);
        match session.process(&sample.skeleton(), at, Utc::now()) {
            SampleOutcome::Dropped => dropped += 1,
            SampleOutcome::Rejected(assessment) => {
                let hint = assessment.primary().map(|c| c.message.as_str()).unwrap_or("-");
                println!("{:>8}ms  score {:>3}  {}", sample.timestamp_ms, assessment.score_int(), hint);
            }
            SampleOutcome::Accepted(assessment, rep) => {
                let hint = assessment.primary().map(|c| c.message.as_str()).unwrap_or("-");
                println!(
                    "{:>8}ms  score {:>3}  rep {} (combo {})  {}",
                    sample.timestamp_ms,
                    rep.accuracy_score,
                    rep.reps_completed,
                    session.combo(),
                    hint
                );
                let reduction = writer.submit(rep, today).await?;
                if reduction.leveled_up {
                    println!("          level up: {}", reduction.profile.level);
                    session.set_level(reduction.profile.level);
                }
                for a in &reduction.unlocked {
                    println!("          achievement: {} (+{} xp)", a.name, a.xp_reward);
                }
                for r in &reduction.new_routines {
                    println!("          routine unlocked: {}", r);
                }
            }
        }
    }

    let done = writer.shutdown().await?;
    print_summary(&pose, samples.len(), dropped, session.reps(), &done.profile);
    if let Some(e) = done.persist_error {
        bail!("profile was not saved: {}", e);
    }
    Ok(())
}

fn print_summary(pose: &PoseId, samples: usize, dropped: usize, reps: u32, profile: &UserProfile) {
    println!();
    println!("=== {} ===", pose);
    println!("samples: {} ({} dropped), reps: {}", samples, dropped, reps);
    println!(
        "level {}  xp {}  streak {} (best {})",
        profile.level, profile.xp, profile.streak_count, profile.best_streak
    );
    if !profile.achievements.is_empty() {
        let names: Vec<&str> = profile.achievements.iter().map(String::as_str).collect();
        println!("achievements: {}", names.join(", "));
    }
    let routines: Vec<String> = profile.unlocked_routines.iter().map(|r| r.to_string()).collect();
    println!("routines: {}", routines.join(", "));
}
