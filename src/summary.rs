use humansize::{BINARY, format_size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::outcome::{ConversionOutcome, FileReport};
use crate::utils::format_duration;

/// A file whose conversion failed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
    /// Whether the original was copied verbatim into the output tree
    pub fallback_copied: bool,
}

/// Aggregate result of one run.
///
/// Built once by [`ConversionSummary::fold`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub converted: u64,
    pub skipped: u64,
    pub original_bytes: u64,
    pub webp_bytes: u64,
    pub elapsed: Duration,
    /// Sorted by path
    pub failures: Vec<FailedFile>,
}

impl ConversionSummary {
    /// Fold per-file reports into a summary.
    ///
    /// Counts and sums are commutative and failures are sorted, so the
    /// result does not depend on the order workers finished in.
    pub fn fold<I>(reports: I, elapsed: Duration) -> Self
    where
        I: IntoIterator<Item = FileReport>,
    {
        let mut summary = reports
            .into_iter()
            .fold(Self::default(), |mut acc, report| {
                match report.outcome {
                    ConversionOutcome::Converted {
                        original_size,
                        webp_size,
                    } => {
                        acc.converted += 1;
                        acc.original_bytes += original_size;
                        acc.webp_bytes += webp_size;
                    }
                    ConversionOutcome::Skipped { .. } => acc.skipped += 1,
                    ConversionOutcome::Failed {
                        error,
                        fallback_copied,
                    } => acc.failures.push(FailedFile {
                        path: report.path,
                        error,
                        fallback_copied,
                    }),
                }
                acc
            });

        summary.failures.sort();
        summary.elapsed = elapsed;
        summary
    }

    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    pub fn total_files(&self) -> u64 {
        self.converted + self.skipped + self.failed()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn space_saved(&self) -> u64 {
        self.original_bytes.saturating_sub(self.webp_bytes)
    }

    /// Size reduction of the converted files, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (self.original_bytes as f64 - self.webp_bytes as f64) / self.original_bytes as f64 * 100.0
    }
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Converted: {} files", self.converted)?;
        writeln!(f, "Skipped: {} files", self.skipped)?;
        writeln!(f, "Failed: {} files", self.failed())?;
        writeln!(f, "Original size: {}", format_size(self.original_bytes, BINARY))?;
        writeln!(f, "WebP size: {}", format_size(self.webp_bytes, BINARY))?;
        writeln!(
            f,
            "Space saved: {} ({:.2}%)",
            format_size(self.space_saved(), BINARY),
            self.reduction_percent()
        )?;
        write!(f, "Elapsed: {}", format_duration(self.elapsed))?;

        if !self.failures.is_empty() {
            write!(f, "\n\nFailed files:")?;
            for failure in &self.failures {
                let note = if failure.fallback_copied {
                    "copied as-is"
                } else {
                    "not copied"
                };
                write!(
                    f,
                    "\n  {} ({note}): {}",
                    failure.path.display(),
                    failure.error
                )?;
            }
        }
        Ok(())
    }
}
