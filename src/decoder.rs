//! Decoder collaborator traits and the scoped media handle.
//!
//! Decoding is delegated: a [`MediaDecoder`] opens a source and returns a
//! [`MediaSession`] that answers duration and frame queries. The snapshotter
//! never holds a raw session; it wraps it in a [`MediaHandle`], which closes
//! the session exactly once when dropped, whatever the request outcome.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::SnapshotError;
use crate::logging::{EventLog, LOG_TAG};
use crate::source::MediaSource;

/// Opens media sources.
pub trait MediaDecoder: Send + Sync {
    /// Open a decoder session bound to `source`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] if the source cannot be opened.
    fn open(&self, source: &MediaSource) -> Result<Box<dyn MediaSession>, SnapshotError>;
}

/// An open decoder session bound to one source.
pub trait MediaSession: Send {
    /// Total duration in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] if the duration is unknown.
    fn duration_ms(&mut self) -> Result<u64, SnapshotError>;

    /// Decode the frame shown at `time_ms`.
    ///
    /// The session may return the nearest available frame. `Ok(None)` means
    /// no frame could be produced at that position.
    ///
    /// # Errors
    ///
    /// Any decoder failure other than "no frame here".
    fn frame_at(&mut self, time_ms: u64) -> Result<Option<DynamicImage>, SnapshotError>;

    /// Release the session.
    ///
    /// # Errors
    ///
    /// Release failures are reported but never change a request's outcome.
    fn close(self: Box<Self>) -> Result<(), SnapshotError>;
}

/// Exclusive, scoped ownership of a [`MediaSession`].
///
/// The session is closed when the handle is dropped. A failing close is
/// logged through the request's [`EventLog`] and otherwise ignored.
pub struct MediaHandle {
    session: Option<Box<dyn MediaSession>>,
    logger: Arc<dyn EventLog>,
}

impl MediaHandle {
    /// Open `source` with `decoder` and take ownership of the session.
    ///
    /// # Errors
    ///
    /// Propagates the decoder's open error.
    pub fn open(
        decoder: &dyn MediaDecoder,
        source: &MediaSource,
        logger: Arc<dyn EventLog>,
    ) -> Result<Self, SnapshotError> {
        let session = decoder.open(source)?;
        Ok(Self {
            session: Some(session),
            logger,
        })
    }

    /// Probe the duration of the underlying media.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] when the session reports none.
    pub fn probe_duration_ms(&mut self) -> Result<u64, SnapshotError> {
        self.session_mut()?.duration_ms()
    }

    /// Decode the frame at `time_ms`.
    ///
    /// # Errors
    ///
    /// See [`MediaSession::frame_at`].
    pub fn frame_at(&mut self, time_ms: u64) -> Result<Option<DynamicImage>, SnapshotError> {
        self.session_mut()?.frame_at(time_ms)
    }

    fn session_mut(&mut self) -> Result<&mut Box<dyn MediaSession>, SnapshotError> {
        self.session
            .as_mut()
            .ok_or_else(|| SnapshotError::Unknown("media handle already released".to_string()))
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(error) = session.close() {
                self.logger
                    .error(LOG_TAG, "failed to release media handle", &error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    struct CountingSession {
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl MediaSession for CountingSession {
        fn duration_ms(&mut self) -> Result<u64, SnapshotError> {
            Ok(10_000)
        }

        fn frame_at(&mut self, _time_ms: u64) -> Result<Option<DynamicImage>, SnapshotError> {
            Ok(Some(DynamicImage::new_rgb8(4, 4)))
        }

        fn close(self: Box<Self>) -> Result<(), SnapshotError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(SnapshotError::Unknown("close failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct CountingDecoder {
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl MediaDecoder for CountingDecoder {
        fn open(&self, _source: &MediaSource) -> Result<Box<dyn MediaSession>, SnapshotError> {
            Ok(Box::new(CountingSession {
                closes: Arc::clone(&self.closes),
                fail_close: self.fail_close,
            }))
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        errors: Mutex<Vec<String>>,
    }

    impl EventLog for RecordingLog {
        fn info(&self, _tag: &str, _message: &str) {}

        fn error(&self, _tag: &str, message: &str, cause: &dyn std::error::Error) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{message}: {cause}"));
        }
    }

    #[test]
    fn handle_closes_exactly_once_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        let decoder = CountingDecoder {
            closes: Arc::clone(&closes),
            fail_close: false,
        };
        let source = MediaSource::parse("a.mp4").unwrap();
        {
            let mut handle =
                MediaHandle::open(&decoder, &source, Arc::new(crate::logging::NoOpLog)).unwrap();
            assert_eq!(handle.probe_duration_ms().unwrap(), 10_000);
            assert!(handle.frame_at(1_000).unwrap().is_some());
            assert_eq!(closes.load(Ordering::SeqCst), 0);
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_failures_are_logged_not_raised() {
        let closes = Arc::new(AtomicUsize::new(0));
        let decoder = CountingDecoder {
            closes: Arc::clone(&closes),
            fail_close: true,
        };
        let log = Arc::new(RecordingLog::default());
        let source = MediaSource::parse("a.mp4").unwrap();
        drop(MediaHandle::open(&decoder, &source, log.clone()).unwrap());

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        let errors = log.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("close failed"));
    }
}
