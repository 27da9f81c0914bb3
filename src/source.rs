//! Media source resolution and output naming.
//!
//! Callers hand over a path, a `file://` URI, or a streaming URL. A
//! [`MediaSource`] keeps the location the decoder should open together with
//! the file name that output snapshots are named after.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::SnapshotError;

/// Where the decoder reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A local file.
    Path(PathBuf),
    /// A URL handed to the decoder untouched (`http://`, `rtsp://`, ...).
    Url(String),
}

/// A validated media source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    original: String,
    location: SourceLocation,
    file_name: String,
}

impl MediaSource {
    /// Resolve a caller-supplied source string.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidRequest`] when the source is empty,
    /// is a URI that does not parse, is a `file://` URI naming a remote host,
    /// or has no file name to derive output names from.
    pub fn parse(source: &str) -> Result<Self, SnapshotError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SnapshotError::InvalidRequest(
                "No source provided".to_string(),
            ));
        }

        let (location, file_name) = if trimmed.contains("://") {
            resolve_uri(trimmed)?
        } else {
            let path = PathBuf::from(trimmed);
            let file_name = path_file_name(&path);
            (SourceLocation::Path(path), file_name)
        };

        if file_name.is_empty() {
            return Err(SnapshotError::InvalidRequest(format!(
                "source has no file name: {trimmed}"
            )));
        }

        Ok(Self {
            original: trimmed.to_string(),
            location,
            file_name,
        })
    }

    /// The source string as supplied (trimmed).
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Where the decoder should read from.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The local path, if this source is a file.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            SourceLocation::Path(path) => Some(path),
            SourceLocation::Url(_) => None,
        }
    }

    /// Last path segment of the source.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File name for the snapshot at 1-based `index`.
    ///
    /// Dots in the source name become underscores so the extension of the
    /// video cannot be mistaken for the extension of the snapshot:
    /// `clip.mp4` yields `clip_mp4-snapshot1.jpg`.
    pub fn snapshot_file_name(&self, index: usize) -> String {
        format!("{}-snapshot{index}.jpg", self.file_name.replace('.', "_"))
    }
}

fn resolve_uri(source: &str) -> Result<(SourceLocation, String), SnapshotError> {
    let invalid = |reason: &str| SnapshotError::InvalidRequest(format!("{reason}: {source}"));

    let url = Url::parse(source)
        .map_err(|error| invalid(&format!("invalid source URI ({error})")))?;
    if has_malformed_escape(url.path()) {
        return Err(invalid("source URI has a malformed percent escape"));
    }

    if url.scheme() == "file" {
        // Remote hosts and paths foreign to this platform are refused.
        let path = url
            .to_file_path()
            .map_err(|()| invalid("source URI is not a local file"))?;
        let file_name = path_file_name(&path);
        return Ok((SourceLocation::Path(path), file_name));
    }

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let file_name = urlencoding::decode(segment)
        .map_err(|_| invalid("source URI file name is not UTF-8"))?
        .into_owned();
    Ok((SourceLocation::Url(source.to_string()), file_name))
}

fn path_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `true` when a `%` in `path` is not followed by two hex digits.
fn has_malformed_escape(path: &str) -> bool {
    path.split('%').skip(1).any(|rest| {
        !rest
            .get(..2)
            .is_some_and(|pair| pair.bytes().all(|byte| byte.is_ascii_hexdigit()))
    })
}
