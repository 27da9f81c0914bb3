//! Error types for the `framesnap` crate.
//!
//! This module defines [`SnapshotError`], the unified error type returned by
//! every fallible operation, and [`ErrorKind`], the coarse classification a
//! caller can branch on without matching individual variants.

use std::{fmt, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// Coarse classification of a [`SnapshotError`].
///
/// Every failure is terminal for its request; the kind only tells the caller
/// which stage gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or empty source, malformed options, unusable overlay font.
    InvalidRequest,
    /// The source could not be opened or its duration could not be read.
    Decode,
    /// The decoder produced no frame for a sample point.
    FrameDecode,
    /// The output directory could not be created or a file not written.
    Storage,
    /// Any other collaborator failure.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::FrameDecode => "FrameDecodeError",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// The unified error type for all `framesnap` operations.
///
/// Variants carry enough context (source, sample point, path) that the
/// rendered message alone is a usable diagnostic for the caller's error
/// channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// The request was rejected before any media was touched.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The source could not be opened, or its duration could not be read.
    #[error("Failed to decode {source_name}: {reason}")]
    Decode {
        /// The source location as given by the caller.
        source_name: String,
        /// Underlying reason reported by the decoder.
        reason: String,
    },

    /// No frame could be produced at a sample point.
    #[error("Failed to decode frame {index} at {time_ms} ms: {reason}")]
    FrameDecode {
        /// 1-based index of the sample point within the plan.
        index: usize,
        /// Sample point in milliseconds.
        time_ms: u64,
        /// Underlying reason reported by the decoder.
        reason: String,
    },

    /// The output directory could not be created or a snapshot not written.
    #[error("Unable to access storage at {path}: {reason}")]
    Storage {
        /// Directory or file that failed.
        path: PathBuf,
        /// Underlying I/O error message.
        reason: String,
    },

    /// The timestamp overlay was requested but no usable font is available.
    #[error("Overlay font error: {0}")]
    Font(String),

    /// JPEG encoding failed.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// Any other collaborator failure.
    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

impl SnapshotError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::InvalidRequest(_) | SnapshotError::Font(_) => ErrorKind::InvalidRequest,
            SnapshotError::Decode { .. } => ErrorKind::Decode,
            SnapshotError::FrameDecode { .. } => ErrorKind::FrameDecode,
            SnapshotError::Storage { .. } => ErrorKind::Storage,
            SnapshotError::Image(_) | SnapshotError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SnapshotError::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(error: serde_json::Error) -> Self {
        SnapshotError::InvalidRequest(format!("malformed options: {error}"))
    }
}
