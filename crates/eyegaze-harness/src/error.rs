use std::path::PathBuf;

use eyegaze_dispatch::{DispatchError, ManifestError};
use thiserror::Error;

/// Failure of a harness command.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unknown manifest variant `{0}` (expected eye-gaze or eye-gaze-social)")]
    UnknownVariant(String),
    #[error("manifest is invalid: {0}")]
    Manifest(#[from] ManifestError),
    #[error("dispatch table could not be built: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("failed reading or writing '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{invalid} of {lines} trace lines are invalid")]
    InvalidTrace { invalid: usize, lines: usize },
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
