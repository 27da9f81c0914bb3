//! FFmpeg-backed decoder and log level configuration.
//!
//! [`FfmpegDecoder`] is the default [`MediaDecoder`]: it opens a source with
//! `ffmpeg-next`, reads its duration from the container, and decodes single
//! frames at millisecond positions by seeking to the preceding keyframe and
//! decoding forward.
//!
//! FFmpeg prints its own warnings to stderr. [`set_ffmpeg_log_level`] tunes
//! that output without importing `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use framesnap::{FfmpegLogLevel, SnapshotRequest, Snapshotter};
//!
//! framesnap::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//!
//! let snapshots = Snapshotter::new().run(&SnapshotRequest::new("input.mp4"))?;
//! # Ok::<(), framesnap::SnapshotError>(())
//! ```

use std::fmt::Display;
use std::str::FromStr;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, RgbImage};

use crate::decoder::{MediaDecoder, MediaSession};
use crate::error::SnapshotError;
use crate::source::{MediaSource, SourceLocation};
use crate::utilities::{self, MICROSECONDS_PER_SECOND};

/// How much FFmpeg itself prints to stderr.
///
/// Independent of the `log` events framesnap emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfmpegLogLevel {
    Quiet,
    Error,
    Warning,
    Info,
    Debug,
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(format!("unsupported FFmpeg log level: {value}")),
        }
    }
}

/// Set FFmpeg's own log verbosity.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(match level {
        FfmpegLogLevel::Quiet => Level::Quiet,
        FfmpegLogLevel::Error => Level::Error,
        FfmpegLogLevel::Warning => Level::Warning,
        FfmpegLogLevel::Info => Level::Info,
        FfmpegLogLevel::Debug => Level::Debug,
    });
}

/// Opens media sources with FFmpeg.
///
/// Local paths and `file://` URIs are opened from disk; any other URL is
/// handed to FFmpeg's protocol layer unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegDecoder;

impl FfmpegDecoder {
    /// Create a decoder. FFmpeg itself is initialised lazily on first open.
    pub fn new() -> Self {
        Self
    }
}

impl MediaDecoder for FfmpegDecoder {
    fn open(&self, source: &MediaSource) -> Result<Box<dyn MediaSession>, SnapshotError> {
        let fail = |reason: String| SnapshotError::Decode {
            source_name: source.as_str().to_string(),
            reason,
        };

        // Safe to call multiple times.
        ffmpeg_next::init().map_err(|error| fail(format!("FFmpeg initialisation failed: {error}")))?;

        let input = match source.location() {
            SourceLocation::Path(path) => {
                log::debug!("Opening media file: {}", path.display());
                ffmpeg_next::format::input(path)
            }
            SourceLocation::Url(url) => {
                log::debug!("Opening media URL: {url}");
                ffmpeg_next::format::network::init();
                ffmpeg_next::format::input(url)
            }
        }
        .map_err(|error| fail(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| fail("no video stream found".to_string()))?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let stream_duration = stream.duration();

        Ok(Box::new(FfmpegSession {
            source_name: source.as_str().to_string(),
            input,
            video_stream_index,
            time_base,
            stream_duration,
        }))
    }
}

/// One open FFmpeg demuxer, bound to its best video stream.
struct FfmpegSession {
    source_name: String,
    input: Input,
    video_stream_index: usize,
    time_base: Rational,
    stream_duration: i64,
}

impl FfmpegSession {
    fn decode_error(&self, reason: impl Display) -> SnapshotError {
        SnapshotError::Decode {
            source_name: self.source_name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Scale a decoded frame to RGB24 and wrap it as an image.
fn convert_frame_to_image(
    scaler: &mut ScalingContext,
    decoded_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, String> {
    let mut rgb_frame = VideoFrame::empty();
    scaler
        .run(decoded_frame, &mut rgb_frame)
        .map_err(|error| error.to_string())?;
    let buffer = utilities::frame_to_rgb_buffer(&rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| "failed to construct RGB image from decoded frame data".to_string())?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}

impl MediaSession for FfmpegSession {
    fn duration_ms(&mut self) -> Result<u64, SnapshotError> {
        let container = self.input.duration();
        if container > 0 {
            return Ok((container / (MICROSECONDS_PER_SECOND / 1000)) as u64);
        }

        // Raw streams often carry no container duration.
        if self.stream_duration > 0 {
            let duration_ms = utilities::pts_to_milliseconds(self.stream_duration, self.time_base);
            if duration_ms > 0 {
                return Ok(duration_ms);
            }
        }

        Err(self.decode_error("media reports no duration"))
    }

    fn frame_at(&mut self, time_ms: u64) -> Result<Option<DynamicImage>, SnapshotError> {
        let video_stream_index = self.video_stream_index;
        let time_base = self.time_base;

        // Build a fresh decoder from the stream parameters.
        let parameters = self
            .input
            .stream(video_stream_index)
            .ok_or_else(|| self.decode_error("video stream disappeared"))?
            .parameters();
        let mut decoder = CodecContext::from_parameters(parameters)
            .and_then(|context| context.decoder().video())
            .map_err(|error| self.decode_error(error))?;
        let (width, height) = (decoder.width(), decoder.height());

        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| self.decode_error(error))?;

        // Container-level seek to the nearest keyframe at or before the target.
        let target = utilities::milliseconds_to_seek_timestamp(time_ms);
        self.input
            .seek(target, ..target)
            .map_err(|error| self.decode_error(error))?;

        let source_name = self.source_name.clone();
        let mut convert = |frame: &VideoFrame| {
            convert_frame_to_image(&mut scaler, frame, width, height)
                .map(Some)
                .map_err(|reason| SnapshotError::Decode {
                    source_name: source_name.clone(),
                    reason,
                })
        };

        let mut decoded_frame = VideoFrame::empty();
        let mut last_frame: Option<VideoFrame> = None;

        for (stream, packet) in self.input.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            if let Err(error) = decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {error}");
                continue;
            }
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.pts().unwrap_or(0);
                if utilities::pts_to_milliseconds(pts, time_base) >= time_ms {
                    return convert(&decoded_frame);
                }
                last_frame = Some(decoded_frame.clone());
            }
        }

        // Flush the decoder.
        if decoder.send_eof().is_ok() {
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.pts().unwrap_or(0);
                if utilities::pts_to_milliseconds(pts, time_base) >= time_ms {
                    return convert(&decoded_frame);
                }
                last_frame = Some(decoded_frame.clone());
            }
        }

        // Past the final frame: the closest available frame is the last one.
        match last_frame {
            Some(frame) => {
                log::debug!("No frame at or after {time_ms} ms; using the last decoded frame");
                convert(&frame)
            }
            None => Ok(None),
        }
    }

    fn close(self: Box<Self>) -> Result<(), SnapshotError> {
        log::debug!("Closing media session for {}", self.source_name);
        Ok(())
    }
}
