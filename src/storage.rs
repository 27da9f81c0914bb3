//! Snapshot storage.
//!
//! [`SnapshotStorage`] abstracts where encoded snapshots end up.
//! [`FileSystemStorage`] writes them to the platform's public pictures
//! directory (via [`dirs::picture_dir`]) unless an output directory is
//! injected.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::SnapshotError;

/// Destination for encoded snapshots.
pub trait SnapshotStorage: Send + Sync {
    /// The directory snapshots are written to.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Storage`] when no such directory is known on
    /// this platform.
    fn resolve_public_pictures_dir(&self) -> Result<PathBuf, SnapshotError>;

    /// Create `directory` (and its parents) if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Storage`] if creation fails.
    fn ensure_dir(&self, directory: &Path) -> Result<(), SnapshotError>;

    /// Write `bytes` to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Storage`] if the write fails.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), SnapshotError>;
}

/// Local filesystem storage.
///
/// # Example
///
/// ```no_run
/// use framesnap::{FileSystemStorage, SnapshotStorage};
///
/// let storage = FileSystemStorage::new().with_directory("/tmp/snapshots");
/// let directory = storage.resolve_public_pictures_dir()?;
/// storage.ensure_dir(&directory)?;
/// # Ok::<(), framesnap::SnapshotError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSystemStorage {
    directory: Option<PathBuf>,
}

impl FileSystemStorage {
    /// Storage rooted at the platform pictures directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write into `directory` instead of the platform pictures directory.
    ///
    /// Relative directories are resolved against the current working
    /// directory so reported snapshot paths are always absolute.
    #[must_use]
    pub fn with_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

impl SnapshotStorage for FileSystemStorage {
    fn resolve_public_pictures_dir(&self) -> Result<PathBuf, SnapshotError> {
        let directory = match &self.directory {
            Some(directory) => directory.clone(),
            None => dirs::picture_dir().ok_or_else(|| {
                SnapshotError::storage("<pictures>", "no public pictures directory on this platform")
            })?,
        };
        std::path::absolute(&directory).map_err(|error| SnapshotError::storage(directory, error))
    }

    fn ensure_dir(&self, directory: &Path) -> Result<(), SnapshotError> {
        if directory.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(directory).map_err(|error| SnapshotError::storage(directory, error))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
        fs::write(path, bytes).map_err(|error| SnapshotError::storage(path, error))
    }
}
