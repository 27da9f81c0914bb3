//! Snapshot requests.
//!
//! [`SnapshotRequest`] is the immutable, per-invocation description of what
//! to sample: the source, how many snapshots, and how to encode and stamp
//! them. It can be built in code or deserialized from the caller's JSON
//! options object.
//!
//! # Example
//!
//! ```
//! use framesnap::SnapshotRequest;
//!
//! let request = SnapshotRequest::new("/sdcard/DCIM/holiday.mp4")
//!     .with_count(4)
//!     .with_prefix("Holiday");
//! assert_eq!(request.quality, 90);
//!
//! let parsed = SnapshotRequest::from_json(r#"{"source": "clip.mp4", "countPerMinute": 2}"#)?;
//! assert_eq!(parsed.count_per_minute, 2);
//! # Ok::<(), framesnap::SnapshotError>(())
//! ```

use serde::Deserialize;

use crate::error::SnapshotError;
use crate::source::MediaSource;

const DEFAULT_COUNT: u32 = 1;
const DEFAULT_QUALITY: u8 = 90;
const DEFAULT_TEXT_SIZE: u32 = 48;

/// Options for a single snapshot request.
///
/// Field names follow the caller-facing option names when deserialized
/// (`countPerMinute`, `timeStamp`, `textSize`). Unknown options are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct SnapshotRequest {
    /// Input video location: a filesystem path, a `file://` URI, or a URL.
    #[serde(default)]
    pub source: String,
    /// Number of snapshots. Overridden by `count_per_minute` when non-zero.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Snapshots per minute of video. `0` disables the rate.
    #[serde(default)]
    pub count_per_minute: u32,
    /// JPEG quality, 0–100.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Whether to stamp the elapsed time onto each snapshot.
    #[serde(default = "default_time_stamp")]
    pub time_stamp: bool,
    /// Text placed before the clock in the overlay label.
    #[serde(default)]
    pub prefix: String,
    /// Overlay font size in pixels for a 1280-pixel-wide frame.
    #[serde(default = "default_text_size")]
    pub text_size: u32,
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_time_stamp() -> bool {
    true
}

fn default_text_size() -> u32 {
    DEFAULT_TEXT_SIZE
}

impl Default for SnapshotRequest {
    fn default() -> Self {
        Self::new("")
    }
}

impl SnapshotRequest {
    /// Create a request for `source` with every option at its default.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            count: DEFAULT_COUNT,
            count_per_minute: 0,
            quality: DEFAULT_QUALITY,
            time_stamp: true,
            prefix: String::new(),
            text_size: DEFAULT_TEXT_SIZE,
        }
    }

    /// Parse a request from the caller's JSON options object.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidRequest`] when the JSON is malformed
    /// or an option has the wrong type or range (e.g. a negative count).
    pub fn from_json(options: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(options)?)
    }

    /// Parse a request from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`from_json`](SnapshotRequest::from_json).
    pub fn from_value(options: serde_json::Value) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_value(options)?)
    }

    /// Set the number of snapshots.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the sampling rate in snapshots per minute of video.
    pub fn with_count_per_minute(mut self, count_per_minute: u32) -> Self {
        self.count_per_minute = count_per_minute;
        self
    }

    /// Set the JPEG quality (0–100).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable the timestamp overlay.
    pub fn with_time_stamp(mut self, enabled: bool) -> Self {
        self.time_stamp = enabled;
        self
    }

    /// Set the overlay label prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the overlay text size (pixels at a 1280-pixel reference width).
    pub fn with_text_size(mut self, text_size: u32) -> Self {
        self.text_size = text_size;
        self
    }

    /// Check the request and resolve its source.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidRequest`] for an empty source, a
    /// quality above 100, or a zero text size with the overlay enabled.
    pub fn validate(&self) -> Result<MediaSource, SnapshotError> {
        if self.quality > 100 {
            return Err(SnapshotError::InvalidRequest(format!(
                "quality must be between 0 and 100, got {}",
                self.quality
            )));
        }
        if self.time_stamp && self.text_size == 0 {
            return Err(SnapshotError::InvalidRequest(
                "textSize must be positive when timeStamp is enabled".to_string(),
            ));
        }
        MediaSource::parse(&self.source)
    }
}
