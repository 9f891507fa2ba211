use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a file was not converted although nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A WebP file is already present at the target path
    AlreadyExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists => write!(f, "already exists"),
        }
    }
}

/// Result of attempting to convert one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Converted { original_size: u64, webp_size: u64 },
    Skipped { reason: SkipReason },
    Failed { error: String, fallback_copied: bool },
}

impl ConversionOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        ConversionOutcome::Skipped { reason }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConversionOutcome::Failed { .. })
    }
}

/// An outcome together with the input it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: ConversionOutcome,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>, outcome: ConversionOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }
}
