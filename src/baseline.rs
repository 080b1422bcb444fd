//! Per-pose target angles.
//!
//! A baseline is loaded lazily the first time its pose is selected and then
//! shared for the rest of the session.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{CoachError, Result};
use crate::pose::AngleName;

/// Pose identity ("FullRollUp", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseId(String);

impl PoseId {
    pub const FULL_ROLL_UP: &'static str = "FullRollUp";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and limited to ASCII letters, digits, `_` and `-`, so it
    /// can name a file without leaving its directory
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for PoseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoseId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Target angle per angle name, in degrees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    targets: BTreeMap<AngleName, f64>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: AngleName, degrees: f64) -> Self {
        self.targets.insert(name, degrees);
        self
    }

    pub fn target(&self, name: AngleName) -> Option<f64> {
        self.targets.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AngleName, f64)> + '_ {
        self.targets.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Parses a flat `{angleName: degrees}` object. Names outside the
    /// tracked set are skipped.
    pub fn from_json_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, f64> = serde_json::from_str(content)?;
        let mut targets = BTreeMap::new();
        for (key, degrees) in raw {
            match key.parse::<AngleName>() {
                Ok(name) => {
                    targets.insert(name, degrees);
                }
                Err(_) => tracing::debug!("[baseline] skipping untracked angle '{}'", key),
            }
        }
        Ok(Self { targets })
    }
}

impl FromIterator<(AngleName, f64)> for Baseline {
    fn from_iter<I: IntoIterator<Item = (AngleName, f64)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

/// Source of baselines, keyed by pose
pub trait BaselineStore: Send + Sync {
    /// `CoachError::BaselineNotFound` when the pose has no baseline
    fn load(&self, pose: &PoseId) -> Result<Baseline>;
}

/// Reads `<dir>/<pose>_baseline_angles.json`
#[derive(Debug, Clone)]
pub struct DirBaselineStore {
    dir: PathBuf,
}

impl DirBaselineStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// `CoachError::InvalidPoseId` for ids that are not [`PoseId::is_file_safe`]
    pub fn path_for(&self, pose: &PoseId) -> Result<PathBuf> {
        if !pose.is_file_safe() {
            return Err(CoachError::InvalidPoseId(pose.to_string()));
        }
        Ok(self.dir.join(format!("{}_baseline_angles.json", pose)))
    }
}

impl BaselineStore for DirBaselineStore {
    fn load(&self, pose: &PoseId) -> Result<Baseline> {
        let path = self.path_for(pose)?;
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoachError::BaselineNotFound(pose.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let baseline = Baseline::from_json_str(&content)
            .map_err(|source| CoachError::BaselineParse { path: path.clone(), source })?;
        tracing::info!(
            "[baseline] loaded {} target angles for {} from {}",
            baseline.len(),
            pose,
            path.display()
        );
        Ok(baseline)
    }
}

/// Fixed set of baselines held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBaselineStore {
    baselines: HashMap<PoseId, Baseline>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pose: PoseId, baseline: Baseline) {
        self.baselines.insert(pose, baseline);
    }

    pub fn with(mut self, pose: impl Into<PoseId>, baseline: Baseline) -> Self {
        self.insert(pose.into(), baseline);
        self
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn load(&self, pose: &PoseId) -> Result<Baseline> {
        self.baselines
            .get(pose)
            .cloned()
            .ok_or_else(|| CoachError::BaselineNotFound(pose.to_string()))
    }
}

/// Loads each pose at most once and hands out shared copies.
///
/// Misses are not cached, so a baseline added later is still picked up.
pub struct CachedBaselineStore<S> {
    inner: S,
    cache: Mutex<HashMap<PoseId, Arc<Baseline>>>,
}

impl<S: BaselineStore> CachedBaselineStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, pose: &PoseId) -> Result<Arc<Baseline>> {
        if let Some(hit) = self.lock().get(pose) {
            return Ok(Arc::clone(hit));
        }
        let baseline = Arc::new(self.inner.load(pose)?);
        self.lock()
            .entry(pose.clone())
            .or_insert_with(|| Arc::clone(&baseline));
        Ok(baseline)
    }

    /// `None` when the pose has no usable baseline; the failure is logged
    pub fn get_or_log(&self, pose: &PoseId) -> Option<Arc<Baseline>> {
        match self.get(pose) {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::warn!("[baseline] {}; scores for this pose are unavailable", e);
                None
            }
        }
    }

    pub fn cached_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PoseId, Arc<Baseline>>> {
        // a poisoned cache still holds valid baselines
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
