//! Parallel snapshot rendering.
//!
//! Distributes the sample points of one plan across [`rayon`] workers. Each
//! worker opens its own [`MediaHandle`] so no decoder session is shared, and
//! renders a contiguous run of points in order. Results are returned in
//! plan order.
//!
//! The public switch is
//! [`Snapshotter::with_parallel`](crate::Snapshotter::with_parallel); this
//! module contains only the internal implementation.

use std::path::PathBuf;
use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::decoder::MediaHandle;
use crate::error::SnapshotError;
use crate::plan::SamplePlan;
use crate::render::FrameRenderer;
use crate::snapshotter::Snapshotter;
use crate::source::MediaSource;

/// Render `plan` across the rayon pool.
///
/// The first failing chunk fails the whole request; snapshots other
/// workers already wrote stay on disk.
pub(crate) fn render_parallel(
    snapshotter: &Snapshotter,
    renderer: &FrameRenderer<'_>,
    source: &MediaSource,
    plan: &SamplePlan,
) -> Result<Vec<PathBuf>, SnapshotError> {
    let points: Vec<(usize, u64)> = plan.iter().collect();
    let chunks = split_into_chunks(&points, rayon::current_num_threads());
    log::debug!(
        "Rendering {} snapshot(s) in {} parallel chunk(s)",
        points.len(),
        chunks.len()
    );

    let results: Result<Vec<Vec<PathBuf>>, SnapshotError> = chunks
        .into_par_iter()
        .map(|chunk| {
            let mut handle = MediaHandle::open(
                &*snapshotter.decoder,
                source,
                Arc::clone(&snapshotter.logger),
            )?;
            renderer.render_all(&mut handle, chunk.iter().copied())
        })
        .collect();

    Ok(results?.into_iter().flatten().collect())
}

/// Split `points` into at most `workers` contiguous, near-equal runs.
fn split_into_chunks(points: &[(usize, u64)], workers: usize) -> Vec<Vec<(usize, u64)>> {
    if points.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, points.len());
    let chunk_size = points.len().div_ceil(workers);
    points.chunks(chunk_size).map(<[_]>::to_vec).collect()
}
