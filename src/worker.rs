//! Background execution of snapshot requests.
//!
//! [`Snapshotter::submit`] runs a request on a dedicated, named worker thread
//! and hands the single [`SnapshotResult`] to a one-shot completion handler.
//! With the `async` feature, [`Snapshotter::snapshot_async`] returns a
//! [`SnapshotFuture`] driven by `tokio::task::spawn_blocking` instead.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crate::error::SnapshotError;
use crate::request::SnapshotRequest;
use crate::snapshotter::{SnapshotResult, Snapshotter};

/// Name given to worker threads.
const WORKER_THREAD_NAME: &str = "framesnap-worker";

impl Snapshotter {
    /// Run `request` on a worker thread and call `on_complete` exactly once
    /// with its outcome.
    ///
    /// The calling thread never blocks. Joining the returned handle is
    /// optional; it only waits for the worker to finish. A panic inside the
    /// request reaches `on_complete` as [`SnapshotError::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the operating system refuses to spawn the
    /// thread. `on_complete` is not called in that case.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use framesnap::{SnapshotRequest, Snapshotter};
    ///
    /// let worker = Snapshotter::new().submit(
    ///     SnapshotRequest::new("input.mp4").with_count(5),
    ///     |result| match result {
    ///         Ok(snapshots) => println!("{}", snapshots.to_json()),
    ///         Err(error) => eprintln!("{error}"),
    ///     },
    /// )?;
    /// worker.join().ok();
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn submit<F>(&self, request: SnapshotRequest, on_complete: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce(SnapshotResult) + Send + 'static,
    {
        let snapshotter = self.clone();
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| snapshotter.run(&request)))
                    .unwrap_or_else(|payload| {
                        Err(SnapshotError::Unknown(format!(
                            "snapshot worker panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                on_complete(result);
            })
    }

    /// Run `request` on tokio's blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use framesnap::{SnapshotError, SnapshotRequest, Snapshotter};
    ///
    /// # async fn example() -> Result<(), SnapshotError> {
    /// let snapshots = Snapshotter::new()
    ///     .snapshot_async(SnapshotRequest::new("input.mp4"))
    ///     .await?;
    /// println!("{} snapshot(s)", snapshots.paths.len());
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "async")]
    pub fn snapshot_async(&self, request: SnapshotRequest) -> SnapshotFuture {
        let snapshotter = self.clone();
        let handle = tokio::task::spawn_blocking(move || snapshotter.run(&request));
        SnapshotFuture { handle }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(feature = "async")]
pub use future::SnapshotFuture;

#[cfg(feature = "async")]
mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::task::JoinHandle;

    use crate::error::SnapshotError;
    use crate::snapshotter::SnapshotResult;

    /// A future that resolves to the outcome of one request.
    ///
    /// Created by [`Snapshotter::snapshot_async`](crate::Snapshotter::snapshot_async).
    /// The request runs on a blocking thread; polling this future only
    /// waits for it. A worker that panics resolves to
    /// [`SnapshotError::Unknown`].
    pub struct SnapshotFuture {
        pub(super) handle: JoinHandle<SnapshotResult>,
    }

    impl Future for SnapshotFuture {
        type Output = SnapshotResult;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            Pin::new(&mut self.handle).poll(cx).map(|result| {
                result.unwrap_or_else(|error| {
                    Err(SnapshotError::Unknown(format!("snapshot worker failed: {error}")))
                })
            })
        }
    }
}
