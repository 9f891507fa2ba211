use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run before any file is converted.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("input path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("input directory has no name to derive an output directory from: {}", .0.display())]
    InvalidInputRoot(PathBuf),

    #[error("cannot create output directory {}: {source}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-file codec failures. These never leave the converter; they end up in a
/// `Failed` outcome instead.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("image {width}x{height} exceeds the WebP limit of {limit}px per side")]
    TooLarge { width: u32, height: u32, limit: u32 },

    #[error("failed to encode WebP: {0}")]
    Encode(String),

    #[error("codec panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, BatchError>;
