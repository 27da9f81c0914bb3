//! Core [`Snapshotter`] implementation.
//!
//! `Snapshotter` is the main entry point for the crate. It owns the
//! collaborators a request needs (decoder, storage, logger, overlay font)
//! and runs a request through its phases: probe the duration, plan the
//! sample points, render each one, and report a single [`SnapshotResult`].

use std::{
    fmt::{self, Debug, Formatter},
    path::PathBuf,
    sync::Arc,
};

use serde_json::{Value, json};

use crate::decoder::{MediaDecoder, MediaHandle};
use crate::error::SnapshotError;
use crate::logging::{EventLog, LOG_TAG, LogFacade};
use crate::overlay::OverlayFont;
use crate::plan::SamplePlan;
use crate::render::FrameRenderer;
use crate::request::SnapshotRequest;
use crate::source::MediaSource;
use crate::storage::{FileSystemStorage, SnapshotStorage};

/// Terminal outcome of one request.
pub type SnapshotResult = Result<Snapshots, SnapshotError>;

/// Phase of a request, in the order they are entered.
///
/// Any phase can end in [`Phase::Failed`]; the first failure skips every
/// remaining render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Accepted, nothing done yet.
    Idle,
    /// Opening the source and reading its duration.
    ProbingDuration,
    /// Computing sample points.
    Planning,
    /// Rendering sample point `index` of `total`.
    Rendering {
        /// 1-based sample index.
        index: usize,
        /// Number of sample points in the plan.
        total: usize,
    },
    /// Every sample point was written.
    Succeeded,
    /// The request stopped at an error.
    Failed(String),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::ProbingDuration => f.write_str("probing duration"),
            Phase::Planning => f.write_str("planning"),
            Phase::Rendering { index, total } => write!(f, "rendering {index}/{total}"),
            Phase::Succeeded => f.write_str("succeeded"),
            Phase::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshots {
    /// Absolute snapshot paths, in sample order.
    pub paths: Vec<PathBuf>,
    /// Probed duration of the source.
    pub duration_ms: u64,
    /// The plan the snapshots were taken from.
    pub plan: SamplePlan,
}

impl Snapshots {
    /// The caller-facing response: `{"result": true, "snapshots": [...]}`.
    pub fn to_json(&self) -> Value {
        let snapshots: Vec<String> = self
            .paths
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        json!({
            "result": true,
            "snapshots": snapshots,
        })
    }
}

/// Samples snapshots from videos.
///
/// Cheap to clone; clones share their collaborators. Requests are
/// independent and hold no shared mutable state, so one snapshotter can
/// serve many concurrent requests.
///
/// # Example
///
/// ```no_run
/// use framesnap::{SnapshotRequest, Snapshotter};
///
/// let snapshotter = Snapshotter::new().with_output_directory("snapshots");
/// let request = SnapshotRequest::new("input.mp4").with_count(3);
/// let snapshots = snapshotter.run(&request)?;
/// for path in &snapshots.paths {
///     println!("{}", path.display());
/// }
/// # Ok::<(), framesnap::SnapshotError>(())
/// ```
#[derive(Clone)]
pub struct Snapshotter {
    pub(crate) decoder: Arc<dyn MediaDecoder>,
    pub(crate) storage: Arc<dyn SnapshotStorage>,
    pub(crate) logger: Arc<dyn EventLog>,
    pub(crate) font: Option<OverlayFont>,
    #[cfg(feature = "rayon")]
    pub(crate) parallel: bool,
}

impl Debug for Snapshotter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshotter")
            .field("font", &self.font)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "ffmpeg")]
impl Default for Snapshotter {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshotter {
    /// A snapshotter backed by FFmpeg, writing to the platform pictures
    /// directory and logging through the `log` crate.
    #[cfg(feature = "ffmpeg")]
    pub fn new() -> Self {
        Self::from_decoder(crate::ffmpeg::FfmpegDecoder::new())
    }

    /// A snapshotter backed by a custom decoder.
    pub fn from_decoder<D: MediaDecoder + 'static>(decoder: D) -> Self {
        Self {
            decoder: Arc::new(decoder),
            storage: Arc::new(FileSystemStorage::new()),
            logger: Arc::new(LogFacade),
            font: None,
            #[cfg(feature = "rayon")]
            parallel: false,
        }
    }

    /// Replace the storage collaborator.
    #[must_use]
    pub fn with_storage<S: SnapshotStorage + 'static>(mut self, storage: S) -> Self {
        self.storage = Arc::new(storage);
        self
    }

    /// Write snapshots to `directory` on the local filesystem instead of
    /// the platform pictures directory.
    #[must_use]
    pub fn with_output_directory<P: Into<PathBuf>>(self, directory: P) -> Self {
        self.with_storage(FileSystemStorage::new().with_directory(directory))
    }

    /// Replace the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn EventLog>) -> Self {
        self.logger = logger;
        self
    }

    /// Use `font` for the timestamp overlay.
    ///
    /// Without an explicit font, the first request that needs one runs
    /// [`OverlayFont::discover`].
    #[must_use]
    pub fn with_font(mut self, font: OverlayFont) -> Self {
        self.font = Some(font);
        self
    }

    /// Render sample points on the rayon pool, one media handle per worker.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run `request` to completion on the calling thread.
    ///
    /// Prefer [`submit`](Snapshotter::submit) from threads that must not
    /// block.
    ///
    /// # Errors
    ///
    /// The first error any phase produced. Snapshots written before a
    /// failure are left in place.
    pub fn run(&self, request: &SnapshotRequest) -> SnapshotResult {
        let mut phase = Phase::Idle;
        let result = self.execute(request, &mut phase);
        match &result {
            Ok(snapshots) => {
                self.enter(&mut phase, Phase::Succeeded);
                self.logger.info(
                    LOG_TAG,
                    &format!("wrote {} snapshot(s) for {}", snapshots.paths.len(), request.source),
                );
            }
            Err(error) => {
                let failed_in = phase.to_string();
                self.enter(&mut phase, Phase::Failed(error.to_string()));
                self.logger.error(
                    LOG_TAG,
                    &format!("snapshot of {:?} failed while {failed_in}", request.source),
                    error,
                );
            }
        }
        result
    }

    fn execute(&self, request: &SnapshotRequest, phase: &mut Phase) -> SnapshotResult {
        let source = request.validate()?;
        self.logger
            .info(LOG_TAG, &format!("Got source: {}", source.as_str()));

        let font = if request.time_stamp {
            Some(self.overlay_font()?)
        } else {
            None
        };

        self.enter(phase, Phase::ProbingDuration);
        let mut handle = MediaHandle::open(&*self.decoder, &source, Arc::clone(&self.logger))?;
        let duration_ms = handle.probe_duration_ms()?;

        self.enter(phase, Phase::Planning);
        let plan = SamplePlan::new(duration_ms, request.count, request.count_per_minute);
        self.logger.info(
            LOG_TAG,
            &format!(
                "duration:{duration_ms} delta:{} points:{}",
                plan.delta_ms(),
                plan.len()
            ),
        );

        let directory = self.storage.resolve_public_pictures_dir()?;
        let renderer = FrameRenderer::new(
            request,
            &source,
            &*self.storage,
            &directory,
            font.as_ref(),
        );

        let paths = self.render_plan(&renderer, &mut handle, &source, &plan, phase)?;

        Ok(Snapshots {
            paths,
            duration_ms,
            plan,
        })
    }

    #[cfg_attr(not(feature = "rayon"), allow(unused_variables))]
    fn render_plan(
        &self,
        renderer: &FrameRenderer<'_>,
        handle: &mut MediaHandle,
        source: &MediaSource,
        plan: &SamplePlan,
        phase: &mut Phase,
    ) -> Result<Vec<PathBuf>, SnapshotError> {
        #[cfg(feature = "rayon")]
        if self.parallel && plan.len() > 1 {
            self.enter(
                phase,
                Phase::Rendering {
                    index: 1,
                    total: plan.len(),
                },
            );
            return crate::parallel::render_parallel(self, renderer, source, plan);
        }

        let total = plan.len();
        let mut paths = Vec::with_capacity(total);
        for (index, time_ms) in plan.iter() {
            self.enter(phase, Phase::Rendering { index, total });
            paths.push(renderer.render(handle, index, time_ms)?);
        }
        Ok(paths)
    }

    fn overlay_font(&self) -> Result<OverlayFont, SnapshotError> {
        match &self.font {
            Some(font) => Ok(font.clone()),
            None => OverlayFont::discover(),
        }
    }

    fn enter(&self, phase: &mut Phase, next: Phase) {
        log::debug!("Snapshot phase: {phase} -> {next}");
        *phase = next;
    }
}
