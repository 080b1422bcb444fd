use std::path::PathBuf;

/// Failures the library surfaces to its caller.
///
/// Missing joints, missing baseline entries and degenerate geometry are not
/// represented here: those are skipped locally and show up as `None` or as an
/// unavailable score.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("no baseline found for pose '{0}'")]
    BaselineNotFound(String),

    #[error("invalid pose id '{0}'")]
    InvalidPoseId(String),

    #[error("failed to parse baseline {path}: {source}")]
    BaselineParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("persistence failed after {attempts} attempt(s): {message}")]
    Persistence { attempts: u32, message: String },

    #[error("profile writer is no longer running")]
    WriterClosed,
}

impl CoachError {
    /// Persistence failures are transient by contract; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoachError::Io(_) | CoachError::Persistence { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoachError>;
