//! End-to-end snapshot pipeline tests.
//!
//! These tests drive [`Snapshotter`] with an in-memory decoder, so they run
//! without FFmpeg media fixtures. Snapshots are written to temporary
//! directories.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    time::Duration,
};

use framesnap::{
    ErrorKind, EventLog, MediaDecoder, MediaSession, MediaSource, NoOpLog, OverlayFont,
    SnapshotError, SnapshotRequest, Snapshotter,
};
use image::{DynamicImage, Rgb, RgbImage};

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 180;
const FIXTURE_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSans.ttf");

#[derive(Clone, Default)]
struct Counters {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    requested: Arc<Mutex<Vec<u64>>>,
}

/// Serves solid dark frames for every position except `missing`.
struct MockDecoder {
    duration_ms: Option<u64>,
    missing: Vec<u64>,
    panics: bool,
    counters: Counters,
}

impl MockDecoder {
    fn new(duration_ms: u64) -> (Self, Counters) {
        let counters = Counters::default();
        let decoder = Self {
            duration_ms: Some(duration_ms),
            missing: Vec::new(),
            panics: false,
            counters: counters.clone(),
        };
        (decoder, counters)
    }

    fn without_frame_at(mut self, time_ms: u64) -> Self {
        self.missing.push(time_ms);
        self
    }

    fn without_duration(mut self) -> Self {
        self.duration_ms = None;
        self
    }

    fn panicking_on_frames(mut self) -> Self {
        self.panics = true;
        self
    }
}

struct MockSession {
    duration_ms: Option<u64>,
    missing: Vec<u64>,
    panics: bool,
    counters: Counters,
}

impl MediaDecoder for MockDecoder {
    fn open(&self, _source: &MediaSource) -> Result<Box<dyn MediaSession>, SnapshotError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            duration_ms: self.duration_ms,
            missing: self.missing.clone(),
            panics: self.panics,
            counters: self.counters.clone(),
        }))
    }
}

impl MediaSession for MockSession {
    fn duration_ms(&mut self) -> Result<u64, SnapshotError> {
        self.duration_ms.ok_or_else(|| SnapshotError::Decode {
            source_name: "mock".to_string(),
            reason: "no duration metadata".to_string(),
        })
    }

    fn frame_at(&mut self, time_ms: u64) -> Result<Option<DynamicImage>, SnapshotError> {
        self.counters.requested.lock().unwrap().push(time_ms);
        if self.panics {
            panic!("decoder blew up at {time_ms} ms");
        }
        if self.missing.contains(&time_ms) {
            return Ok(None);
        }
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            FRAME_WIDTH,
            FRAME_HEIGHT,
            Rgb([10, 20, 30]),
        ))))
    }

    fn close(self: Box<Self>) -> Result<(), SnapshotError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingLog {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl EventLog for RecordingLog {
    fn info(&self, _tag: &str, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, _tag: &str, message: &str, cause: &dyn std::error::Error) {
        self.errors.lock().unwrap().push(format!("{message}: {cause}"));
    }
}

fn snapshotter(decoder: MockDecoder, directory: &std::path::Path) -> Snapshotter {
    Snapshotter::from_decoder(decoder)
        .with_output_directory(directory)
        .with_logger(Arc::new(NoOpLog))
}

fn plain_request(source: &str) -> SnapshotRequest {
    SnapshotRequest::new(source).with_time_stamp(false)
}

#[test]
fn three_snapshots_of_a_130_second_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let snapshots = snapshotter
        .run(&plain_request("/videos/clip.mp4").with_count(3))
        .expect("Snapshot request failed");

    assert_eq!(snapshots.duration_ms, 130_000);
    assert_eq!(snapshots.plan.delta_ms(), 32_500);
    assert_eq!(
        *counters.requested.lock().unwrap(),
        vec![32_500, 65_000, 97_500]
    );

    let expected: Vec<PathBuf> = (1..=3)
        .map(|index| {
            temporary_directory
                .path()
                .join(format!("clip_mp4-snapshot{index}.jpg"))
        })
        .collect();
    assert_eq!(snapshots.paths, expected);

    for path in &snapshots.paths {
        assert!(path.is_absolute());
        let image = image::open(path).expect("Snapshot is not a readable image");
        assert_eq!((image.width(), image.height()), (FRAME_WIDTH, FRAME_HEIGHT));
    }

    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

    let response = snapshots.to_json();
    assert_eq!(response["result"], true);
    assert_eq!(response["snapshots"].as_array().unwrap().len(), 3);
}

#[test]
fn rate_per_minute_overrides_count() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(180_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let request = plain_request("rate.mp4")
        .with_count(50)
        .with_count_per_minute(1);
    let snapshots = snapshotter.run(&request).unwrap();

    assert_eq!(snapshots.paths.len(), 3);
    assert_eq!(
        *counters.requested.lock().unwrap(),
        vec![45_000, 90_000, 135_000]
    );
}

#[test]
fn empty_source_is_rejected_before_decoding() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let error = snapshotter
        .run(&SnapshotRequest::new(""))
        .expect_err("Empty source must fail");

    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
    assert_eq!(counters.opens.load(Ordering::SeqCst), 0);
    assert_eq!(
        std::fs::read_dir(temporary_directory.path()).unwrap().count(),
        0
    );
}

#[test]
fn missing_frame_aborts_without_rollback() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder.without_frame_at(65_000), temporary_directory.path());

    let error = snapshotter
        .run(&plain_request("clip.mp4").with_count(3))
        .expect_err("Missing frame must fail the request");

    assert_eq!(error.kind(), ErrorKind::FrameDecode);
    match &error {
        SnapshotError::FrameDecode { index, time_ms, .. } => {
            assert_eq!((*index, *time_ms), (2, 65_000));
        }
        other => panic!("Unexpected error: {other}"),
    }

    let directory = temporary_directory.path();
    assert!(directory.join("clip_mp4-snapshot1.jpg").is_file());
    assert!(!directory.join("clip_mp4-snapshot2.jpg").exists());
    assert!(!directory.join("clip_mp4-snapshot3.jpg").exists());

    // Point 3 is never attempted; the handle is still released.
    assert_eq!(*counters.requested.lock().unwrap(), vec![32_500, 65_000]);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_duration_is_a_decode_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(0);
    let snapshotter = snapshotter(decoder.without_duration(), temporary_directory.path());

    let error = snapshotter.run(&plain_request("clip.mp4")).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Decode);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn short_videos_succeed_with_no_snapshots() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(800);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let snapshots = snapshotter
        .run(&plain_request("tiny.mp4").with_count(4))
        .unwrap();

    assert!(snapshots.paths.is_empty());
    assert!(counters.requested.lock().unwrap().is_empty());
    assert_eq!(snapshots.to_json()["snapshots"], serde_json::json!([]));
}

#[test]
fn reruns_reuse_the_same_names() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let request = plain_request("file:///sdcard/My%20Clip.v2.mp4").with_count(2);

    let (first_decoder, _) = MockDecoder::new(60_000);
    let first = snapshotter(first_decoder, temporary_directory.path())
        .run(&request)
        .unwrap();
    let (second_decoder, _) = MockDecoder::new(60_000);
    let second = snapshotter(second_decoder, temporary_directory.path())
        .run(&request)
        .unwrap();

    assert_eq!(first.paths, second.paths);
    assert_eq!(
        first.paths[0].file_name().unwrap(),
        "My Clip_v2_mp4-snapshot1.jpg"
    );
    assert_eq!(
        std::fs::read_dir(temporary_directory.path()).unwrap().count(),
        2
    );
}

#[test]
fn output_directory_is_created_on_demand() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let nested = temporary_directory.path().join("a").join("b");
    let (decoder, _) = MockDecoder::new(10_000);

    let snapshots = snapshotter(decoder, &nested)
        .run(&plain_request("clip.mp4"))
        .unwrap();

    assert_eq!(snapshots.paths, vec![nested.join("clip_mp4-snapshot1.jpg")]);
    assert!(snapshots.paths[0].is_file());
}

#[test]
fn unwritable_output_is_a_storage_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let blocker = temporary_directory.path().join("not-a-directory");
    std::fs::write(&blocker, b"occupied").unwrap();
    let (decoder, counters) = MockDecoder::new(10_000);

    let error = snapshotter(decoder, &blocker.join("inner"))
        .run(&plain_request("clip.mp4"))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Storage);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn request_events_reach_the_injected_logger() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, _) = MockDecoder::new(130_000);
    let log = Arc::new(RecordingLog::default());
    let snapshotter = Snapshotter::from_decoder(decoder.without_frame_at(32_500))
        .with_output_directory(temporary_directory.path())
        .with_logger(log.clone());

    assert!(snapshotter.run(&plain_request("clip.mp4").with_count(3)).is_err());

    let infos = log.infos.lock().unwrap();
    assert!(infos.iter().any(|line| line == "Got source: clip.mp4"));
    assert!(infos.iter().any(|line| line == "duration:130000 delta:32500 points:3"));
    let errors = log.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Failed to decode frame 1 at 32500 ms"));
}

#[test]
fn submit_reports_exactly_once() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, _) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let (sender, receiver) = mpsc::channel();
    let worker = snapshotter
        .submit(plain_request("clip.mp4").with_count(3), move |result| {
            sender.send(result).unwrap();
        })
        .expect("Failed to spawn worker");
    worker.join().expect("Worker panicked");

    let result = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("Completion handler was not called");
    assert_eq!(result.unwrap().paths.len(), 3);
    // The sender was consumed by the one-shot handler.
    assert!(receiver.recv().is_err());
}

#[test]
fn submit_reports_failures_through_the_handler() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, _) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let (sender, receiver) = mpsc::channel();
    snapshotter
        .submit(SnapshotRequest::new("   "), move |result| {
            sender.send(result).unwrap();
        })
        .unwrap()
        .join()
        .unwrap();

    let error = receiver.recv().unwrap().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
}

#[test]
fn submit_reports_worker_panics_as_unknown() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder.panicking_on_frames(), temporary_directory.path());

    let (sender, receiver) = mpsc::channel();
    let worker = snapshotter
        .submit(plain_request("clip.mp4"), move |result| {
            sender.send(result).unwrap();
        })
        .expect("Failed to spawn worker");
    worker.join().expect("Panic escaped the worker");

    let error = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("Completion handler was not called")
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert!(error.to_string().contains("decoder blew up at 65000 ms"), "{error}");
    // The session guard still closes the decoder while unwinding.
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn time_stamp_overlay_changes_the_output() {
    let font = OverlayFont::from_file(FIXTURE_FONT).expect("Failed to load fixture font");
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");

    let (plain_decoder, _) = MockDecoder::new(130_000);
    let plain = snapshotter(plain_decoder, &temporary_directory.path().join("plain"))
        .run(&plain_request("clip.mp4"))
        .unwrap();

    let (stamped_decoder, _) = MockDecoder::new(130_000);
    let stamped = snapshotter(stamped_decoder, &temporary_directory.path().join("stamped"))
        .with_font(font)
        .run(&SnapshotRequest::new("clip.mp4").with_prefix("Cam"))
        .unwrap();

    let plain_bytes = std::fs::read(&plain.paths[0]).unwrap();
    let stamped_bytes = std::fs::read(&stamped.paths[0]).unwrap();
    assert_ne!(plain_bytes, stamped_bytes);
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_rendering_keeps_plan_order() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, counters) = MockDecoder::new(600_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path()).with_parallel(true);

    let snapshots = snapshotter
        .run(&plain_request("long.mp4").with_count(9))
        .unwrap();

    let expected: Vec<PathBuf> = (1..=9)
        .map(|index| {
            temporary_directory
                .path()
                .join(format!("long_mp4-snapshot{index}.jpg"))
        })
        .collect();
    assert_eq!(snapshots.paths, expected);
    assert_eq!(
        counters.opens.load(Ordering::SeqCst),
        counters.closes.load(Ordering::SeqCst)
    );
}

#[cfg(feature = "async")]
#[tokio::test]
async fn async_requests_resolve_to_the_same_result() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let (decoder, _) = MockDecoder::new(130_000);
    let snapshotter = snapshotter(decoder, temporary_directory.path());

    let snapshots = snapshotter
        .snapshot_async(plain_request("clip.mp4").with_count(3))
        .await
        .unwrap();

    assert_eq!(snapshots.plan.points(), &[32_500, 65_000, 97_500]);
    assert!(snapshots.paths.iter().all(|path| path.is_file()));
}
