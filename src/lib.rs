//! # webpbatch
//!
//! Batch converts the JPEG and PNG images of a directory tree to WebP.
//!
//! For an input directory `photos/` the converted files land in the sibling
//! directory `photos_webp/`, with every subdirectory mirrored. Files that
//! already have a WebP counterpart are skipped, and files the codec cannot
//! handle are copied over unchanged and listed in the summary.
//!
//! ```no_run
//! let summary = webpbatch::convert_directory("photos")?;
//! println!("{summary}");
//! # Ok::<(), webpbatch::BatchError>(())
//! ```

pub mod codec;
pub mod config;
pub mod converter;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod progress;
pub mod report;
pub mod summary;
pub mod utils;
pub mod walker;

// Re-export commonly used types
pub use codec::ImageCodec;
pub use config::{ConversionOptions, FileConfig};
pub use converter::FileConverter;
pub use crate::core::BatchCore;
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::{BatchError, CodecError};
pub use outcome::{ConversionOutcome, FileReport, SkipReason};
pub use progress::{RunProgress, RunState};
pub use report::{ConversionReport, ReportFormat, write_report};
pub use summary::{ConversionSummary, FailedFile};
pub use walker::{DirectoryMapping, DirectoryWalker, ImageFile, WalkPlan, WorkUnit};

use std::path::{Path, PathBuf};

/// Convert every image under `input_dir` with the default settings.
pub fn convert_directory(input_dir: impl AsRef<Path>) -> Result<ConversionSummary, BatchError> {
    let options = ConversionOptions::new(input_dir.as_ref());
    BatchCore::new(options).run().map(|report| report.summary)
}

/// Ask the user for an input directory with the native folder dialog.
#[cfg(feature = "gui")]
pub fn select_directory() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select the folder to convert")
        .pick_folder()
}

/// Where the converted tree for `input_dir` goes.
pub fn output_dir_for(input_dir: impl AsRef<Path>) -> Result<PathBuf, BatchError> {
    walker::output_root_for(input_dir.as_ref())
}
