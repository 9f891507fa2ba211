use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::codec::ImageCodec;
use crate::error::CodecError;
use crate::outcome::{ConversionOutcome, SkipReason};
use crate::utils::{panic_message, webp_file_name};
use crate::walker::{ImageFile, WorkUnit};

/// Converts one discovered file into its output directory.
///
/// Never returns an error: codec problems become a `Failed` outcome after a
/// verbatim copy of the source has been attempted.
#[derive(Debug, Clone, Default)]
pub struct FileConverter {
    codec: ImageCodec,
}

enum WriteError {
    Exists,
    Codec(CodecError),
}

impl FileConverter {
    pub fn new(codec: ImageCodec) -> Self {
        Self { codec }
    }

    /// Converts a walked unit. A unit whose `.webp` name is claimed by an
    /// earlier file is copied unchanged instead.
    pub fn convert_unit(&self, unit: &WorkUnit) -> ConversionOutcome {
        match &unit.claimed_by {
            Some(owner) => self.keep_original(&unit.file, &unit.output_dir, owner),
            None => self.convert(&unit.file, &unit.output_dir),
        }
    }

    pub fn convert(&self, file: &ImageFile, output_dir: &Path) -> ConversionOutcome {
        let Some(target_name) = webp_file_name(&file.path) else {
            return self.fail(file, output_dir, "input has no file name".to_string());
        };
        let target = output_dir.join(target_name);

        if target.exists() {
            log::debug!("Skipping {}: {} exists", file.path.display(), target.display());
            return ConversionOutcome::skipped(SkipReason::AlreadyExists);
        }

        match self.encode_into(&file.path, &target) {
            Ok(webp_size) => {
                log::debug!(
                    "Converted {} -> {} ({} -> {} bytes)",
                    file.path.display(),
                    target.display(),
                    file.size,
                    webp_size
                );
                ConversionOutcome::Converted {
                    original_size: file.size,
                    webp_size,
                }
            }
            Err(WriteError::Exists) => {
                let error = format!(
                    "{} was created by another file during conversion",
                    target.display()
                );
                self.fail(file, output_dir, error)
            }
            Err(WriteError::Codec(e)) => self.fail(file, output_dir, e.to_string()),
        }
    }

    fn keep_original(
        &self,
        file: &ImageFile,
        output_dir: &Path,
        owner: &Path,
    ) -> ConversionOutcome {
        if let Some(name) = file.path.file_name() {
            let copy = output_dir.join(name);
            if copy.exists() {
                log::debug!("Skipping {}: {} exists", file.path.display(), copy.display());
                return ConversionOutcome::skipped(SkipReason::AlreadyExists);
            }
        }

        let error = format!("WebP name already taken by {}", owner.display());
        self.fail(file, output_dir, error)
    }

    fn encode_into(&self, input: &Path, target: &Path) -> Result<u64, WriteError> {
        let bytes = panic::catch_unwind(AssertUnwindSafe(|| self.codec.transcode(input)))
            .map_err(|payload| CodecError::Panicked(panic_message(payload.as_ref())))
            .and_then(|result| result)
            .map_err(WriteError::Codec)?;

        // create_new: two inputs mapping to the same name (a.jpg, a.png) must not
        // overwrite each other
        let mut out = match OpenOptions::new().write(true).create_new(true).open(target) {
            Ok(out) => out,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(WriteError::Exists),
            Err(e) => return Err(WriteError::Codec(e.into())),
        };

        if let Err(e) = out.write_all(&bytes).and_then(|_| out.flush()) {
            drop(out);
            if let Err(cleanup) = fs::remove_file(target) {
                log::warn!("Could not remove partial {}: {}", target.display(), cleanup);
            }
            return Err(WriteError::Codec(e.into()));
        }

        Ok(bytes.len() as u64)
    }

    fn fail(&self, file: &ImageFile, output_dir: &Path, error: String) -> ConversionOutcome {
        log::error!("Failed to convert {}: {}", file.path.display(), error);

        let fallback_copied = match copy_original(&file.path, output_dir) {
            Ok(dest) => {
                log::warn!("Copied {} to {} unchanged", file.path.display(), dest.display());
                true
            }
            Err(e) => {
                log::error!("Failed to copy {}: {}", file.path.display(), e);
                false
            }
        };

        ConversionOutcome::Failed {
            error,
            fallback_copied,
        }
    }
}

/// Verbatim copy under the original file name, keeping the timestamps.
fn copy_original(source: &Path, output_dir: &Path) -> io::Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "input has no file name"))?;
    let dest = output_dir.join(name);

    fs::copy(source, &dest)?;

    if let Ok(metadata) = fs::metadata(source) {
        let atime = filetime::FileTime::from_last_access_time(&metadata);
        let mtime = filetime::FileTime::from_last_modification_time(&metadata);
        if let Err(e) = filetime::set_file_times(&dest, atime, mtime) {
            log::debug!("Could not preserve timestamps on {}: {}", dest.display(), e);
        }
    }

    Ok(dest)
}
