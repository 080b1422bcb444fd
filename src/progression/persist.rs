//! Storage collaborators for profile snapshots and rep results.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::profile::UserProfile;
use crate::error::Result;
use crate::session::RepResult;

/// Durable home of a single profile
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<UserProfile>>;
    fn save(&self, profile: &UserProfile) -> Result<()>;
}

/// Receives each accepted rep
pub trait RepResultSink: Send + Sync {
    fn emit(&self, rep: &RepResult) -> Result<()>;
}

/// Pretty-printed JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonFileProfileStore {
    fn load(&self) -> Result<Option<UserProfile>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile: UserProfile = serde_json::from_str(&content)?;
        Ok(Some(profile.normalized()))
    }

    fn save(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            serde_json::to_writer_pretty(&mut file, profile)?;
            file.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!("[persist] profile saved to {}", self.path.display());
        Ok(())
    }
}

/// Appends one JSON object per line
pub struct JsonLinesRepSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesRepSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RepResultSink for JsonLinesRepSink {
    fn emit(&self, rep: &RepResult) -> Result<()> {
        let mut line = serde_json::to_string(rep)?;
        line.push('\n');
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Reads a rep log written by [`JsonLinesRepSink`]. A missing file is an
/// empty history; unparseable lines are skipped.
pub fn load_rep_history<P: AsRef<Path>>(path: P) -> Result<Vec<RepResult>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut reps = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(rep) => reps.push(rep),
            Err(e) => tracing::warn!("[persist] {}:{}: skipping bad rep line: {}", path.display(), i + 1, e),
        }
    }
    Ok(reps)
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RepResultSink for NullSink {
    fn emit(&self, _rep: &RepResult) -> Result<()> {
        Ok(())
    }
}
