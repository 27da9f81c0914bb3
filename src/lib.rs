//! # framesnap
//!
//! Sample evenly-spaced still snapshots from video files, optionally stamped
//! with the elapsed time they were taken at.
//!
//! A [`Snapshotter`] probes a video's duration, plans a fixed number of
//! sample points across it, decodes a frame at each point, draws a
//! `"<prefix> HH:MM:SS"` label onto it, encodes it as JPEG, and writes it to
//! the platform pictures directory (or a directory of your choice). Decoding
//! is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Take Snapshots
//!
//! ```no_run
//! use framesnap::{SnapshotRequest, Snapshotter};
//!
//! let snapshotter = Snapshotter::new().with_output_directory("snapshots");
//! let request = SnapshotRequest::new("input.mp4")
//!     .with_count(5)
//!     .with_prefix("Clip A");
//! let snapshots = snapshotter.run(&request).unwrap();
//! println!("{}", snapshots.to_json());
//! ```
//!
//! ### From Caller JSON, on a Worker Thread
//!
//! ```no_run
//! use framesnap::{SnapshotRequest, Snapshotter};
//!
//! let request = SnapshotRequest::from_json(
//!     r#"{"source": "file:///sdcard/clip.mp4", "countPerMinute": 2, "quality": 80}"#,
//! )
//! .unwrap();
//! Snapshotter::new()
//!     .submit(request, |result| match result {
//!         Ok(snapshots) => println!("{}", snapshots.to_json()),
//!         Err(error) => eprintln!("{error}"),
//!     })
//!     .unwrap();
//! ```
//!
//! ### Plan Without Touching Media
//!
//! ```
//! use framesnap::SamplePlan;
//!
//! let plan = SamplePlan::new(130_000, 3, 0);
//! assert_eq!(plan.points(), &[32_500, 65_000, 97_500]);
//! assert_eq!(framesnap::overlay::format_clock(3_661_000), "01:01:01");
//! ```
//!
//! ## Features
//!
//! - **Even sampling**: a fixed count or a rate per minute, never closer
//!   than one second apart
//! - **Timestamp overlay**: resolution-independent label size, drawn with
//!   any TrueType/OpenType font
//! - **Pluggable collaborators**: swap the decoder, storage, or logger via
//!   the [`MediaDecoder`], [`SnapshotStorage`], and [`EventLog`] traits
//! - **Scoped media handles**: the decoder session is always released
//! - **Background execution**: one-shot completion handlers on a worker
//!   thread
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | FFmpeg-backed `FfmpegDecoder` and the `framesnap` CLI (default) |
//! | `async` | `SnapshotFuture` for async requests via Tokio |
//! | `rayon` | Render sample points across rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! With the default `ffmpeg` feature, FFmpeg development libraries must be
//! installed on your system.

pub mod decoder;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod logging;
pub mod overlay;
#[cfg(feature = "rayon")]
mod parallel;
pub mod plan;
pub mod render;
pub mod request;
pub mod snapshotter;
pub mod source;
pub mod storage;
#[cfg(feature = "ffmpeg")]
mod utilities;
mod worker;

pub use decoder::{MediaDecoder, MediaHandle, MediaSession};
pub use error::{ErrorKind, SnapshotError};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegDecoder, FfmpegLogLevel, set_ffmpeg_log_level};
pub use logging::{EventLog, LOG_TAG, LogFacade, NoOpLog};
pub use overlay::{OverlayFont, OverlayLayout, format_clock, format_label};
pub use plan::{MIN_DELTA_MS, SamplePlan, plan};
pub use render::{FrameImage, FrameRenderer};
pub use request::SnapshotRequest;
pub use snapshotter::{Phase, SnapshotResult, Snapshots, Snapshotter};
pub use source::{MediaSource, SourceLocation};
pub use storage::{FileSystemStorage, SnapshotStorage};
#[cfg(feature = "async")]
pub use worker::SnapshotFuture;
