//! Frame rendering: decode, stamp, encode, persist.
//!
//! [`FrameImage`] is the per-sample raster that flows through the pipeline.
//! [`FrameRenderer`] applies one request's settings to every sample point of
//! a plan, strictly in order, and stops at the first failure.

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage, codecs::jpeg::JpegEncoder};

use crate::decoder::MediaHandle;
use crate::error::SnapshotError;
use crate::overlay::{self, OverlayFont};
use crate::request::SnapshotRequest;
use crate::source::MediaSource;
use crate::storage::SnapshotStorage;

/// A decoded frame taken at one sample point.
#[derive(Debug, Clone)]
pub struct FrameImage {
    /// 1-based position of the sample point in its plan.
    pub index: usize,
    /// Sample point in milliseconds.
    pub time_ms: u64,
    /// RGB pixels, stamped in place when the overlay is enabled.
    pub pixels: RgbImage,
}

impl FrameImage {
    /// Wrap a decoded frame, converting it to 8-bit RGB.
    pub fn new(index: usize, time_ms: u64, image: DynamicImage) -> Self {
        Self {
            index,
            time_ms,
            pixels: image.into_rgb8(),
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Draw `"<prefix> HH:MM:SS"` for this frame's sample point.
    pub fn stamp(&mut self, prefix: &str, text_size: u32, font: &OverlayFont) {
        let label = overlay::format_label(prefix, self.time_ms);
        overlay::stamp(&mut self.pixels, &label, text_size, font);
    }

    /// Encode as baseline JPEG.
    ///
    /// `quality` is 0–100; the encoder's floor is 1, so 0 encodes as 1.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Image`] if encoding fails.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder.encode_image(&self.pixels)?;
        Ok(bytes)
    }
}

/// Renders the sample points of one request.
pub struct FrameRenderer<'a> {
    request: &'a SnapshotRequest,
    source: &'a MediaSource,
    storage: &'a dyn SnapshotStorage,
    directory: &'a Path,
    font: Option<&'a OverlayFont>,
}

impl<'a> FrameRenderer<'a> {
    /// Build a renderer writing into `directory`.
    ///
    /// `font` must be `Some` when the request enables the overlay; a `None`
    /// font with the overlay enabled leaves frames unstamped.
    pub fn new(
        request: &'a SnapshotRequest,
        source: &'a MediaSource,
        storage: &'a dyn SnapshotStorage,
        directory: &'a Path,
        font: Option<&'a OverlayFont>,
    ) -> Self {
        Self {
            request,
            source,
            storage,
            directory,
            font,
        }
    }

    /// Output path of the snapshot at 1-based `index`.
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.directory.join(self.source.snapshot_file_name(index))
    }

    /// Decode, stamp, encode, and persist the sample point `time_ms`.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::FrameDecode`] if the decoder returns no frame.
    /// - [`SnapshotError::Image`] if JPEG encoding fails.
    /// - [`SnapshotError::Storage`] if the directory or file cannot be
    ///   written.
    pub fn render(
        &self,
        handle: &mut MediaHandle,
        index: usize,
        time_ms: u64,
    ) -> Result<PathBuf, SnapshotError> {
        let decoded = handle
            .frame_at(time_ms)
            .map_err(|error| match error {
                SnapshotError::FrameDecode { .. } => error,
                other => SnapshotError::FrameDecode {
                    index,
                    time_ms,
                    reason: other.to_string(),
                },
            })?
            .ok_or_else(|| SnapshotError::FrameDecode {
                index,
                time_ms,
                reason: "decoder returned no frame".to_string(),
            })?;

        let mut frame = FrameImage::new(index, time_ms, decoded);
        log::debug!(
            "Rendering snapshot {index} at {time_ms} ms ({}x{})",
            frame.width(),
            frame.height()
        );

        if self.request.time_stamp {
            if let Some(font) = self.font {
                frame.stamp(&self.request.prefix, self.request.text_size, font);
            }
        }

        let bytes = frame.encode_jpeg(self.request.quality)?;

        self.storage.ensure_dir(self.directory)?;
        let path = self.output_path(index);
        self.storage.write(&path, &bytes)?;
        Ok(path)
    }

    /// Render every `(index, time_ms)` pair in order with one handle.
    ///
    /// Stops at the first failure. Snapshots already written stay on disk.
    ///
    /// # Errors
    ///
    /// The first error from [`render`](FrameRenderer::render).
    pub fn render_all(
        &self,
        handle: &mut MediaHandle,
        points: impl IntoIterator<Item = (usize, u64)>,
    ) -> Result<Vec<PathBuf>, SnapshotError> {
        points
            .into_iter()
            .map(|(index, time_ms)| self.render(handle, index, time_ms))
            .collect()
    }
}
