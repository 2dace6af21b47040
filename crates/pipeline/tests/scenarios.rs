use capture::{CameraSource, ImageSource, MemoryReader, SourceKind, VideoSource};
use data_contracts::{FieldError, ReportFields, IMAGE_PATH_SENTINEL};
use image::{Rgb, RgbImage};
use inference::DetectorAdapter;
use pipeline::prelude::*;
use report_store::{ReportStore, IMAGES_DIR, LOG_FILE};
use std::path::Path;
use std::sync::{Arc, Mutex};
use vision_core::interfaces::{BoundingBox, Detection, Detector, Frame, InferenceError};

/// Returns one pothole per frame and records which frames it saw.
#[derive(Default)]
struct ScriptedDetector {
    seen: Arc<Mutex<Vec<u64>>>,
    fail_on: Option<u64>,
}

impl Detector for ScriptedDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, InferenceError> {
        self.seen.lock().unwrap().push(frame.index);
        if self.fail_on == Some(frame.index) {
            return Err(InferenceError::Frame {
                frame: frame.index,
                msg: "scripted failure".into(),
            });
        }
        Ok(vec![Detection {
            class_id: 0,
            label: "Pothole".into(),
            confidence: 0.62,
            bbox: BoundingBox::from_corners(4.0, 4.0, 20.0, 16.0),
        }])
    }

    fn label_for(&self, class_id: usize) -> &str {
        inference::label_for(class_id)
    }
}

fn session_with(detector: ScriptedDetector) -> Session {
    Session::new(DetectorAdapter::new(Arc::new(detector)))
}

fn road(w: u32, h: u32) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb([70, 70, 70]))
}

fn frames(n: usize) -> Vec<RgbImage> {
    (0..n).map(|_| road(32, 24)).collect()
}

fn fields(map_link: &str) -> ReportFields {
    ReportFields {
        reporter_name: "Budi".into(),
        location_text: "Jl. Mawar".into(),
        map_link: map_link.into(),
        description: "Lubang besar di tengah jalan".into(),
        category: "Pothole".into(),
    }
}

fn row_count(root: &Path) -> usize {
    ReportStore::open(root).unwrap().read_rows().unwrap().len()
}

#[test]
fn image_upload_is_annotated_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let mut session = session_with(ScriptedDetector::default());

    session
        .start(Box::new(ImageSource::from_image(road(64, 48))), SourceKind::Image)
        .unwrap();
    assert_eq!(
        session.tick(),
        TickOutcome::Processed {
            index: 0,
            detections: 1
        }
    );
    assert_eq!(session.last_detections()[0].label, "Pothole");
    assert_eq!(session.tick(), TickOutcome::Ended(StreamEnd::Exhausted));
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.retained_frame().is_some());

    let receipt = session
        .submit(&fields("https://maps.app.goo.gl/xyz"), &mut store)
        .unwrap();
    assert_eq!(session.state(), SessionState::Persisted);
    assert!(Path::new(&receipt.image_path).exists());
    assert_eq!(receipt.row.category, "Pothole");
    assert_eq!(row_count(dir.path()), 1);
}

#[test]
fn bad_map_link_blocks_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let mut session = session_with(ScriptedDetector::default());
    session
        .start(Box::new(ImageSource::from_image(road(64, 48))), SourceKind::Image)
        .unwrap();
    session.run_to_end();

    let err = session
        .submit(&fields("http://example.com"), &mut store)
        .unwrap_err();
    match err {
        SubmitError::Validation(errors) => {
            assert!(errors.contains(&FieldError::NotAMapLink));
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.retained_frame().is_some());
    assert!(!dir.path().join(LOG_FILE).exists());
    assert_eq!(
        std::fs::read_dir(dir.path().join(IMAGES_DIR)).unwrap().count(),
        0
    );

    // Corrected fields go through with the same retained frame.
    session
        .submit(&fields("https://maps.app.goo.gl/xyz"), &mut store)
        .unwrap();
    assert_eq!(row_count(dir.path()), 1);
}

#[test]
fn video_stride_detects_every_third_frame() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut session = session_with(ScriptedDetector {
        seen: seen.clone(),
        fail_on: None,
    });
    let source = VideoSource::new(Box::new(MemoryReader::new(frames(10))), 3);
    session.start(Box::new(source), SourceKind::Video).unwrap();

    let mut skipped = Vec::new();
    loop {
        match session.tick() {
            TickOutcome::Skipped { index } => skipped.push(index),
            TickOutcome::Ended(end) => {
                assert_eq!(end, StreamEnd::Exhausted);
                break;
            }
            TickOutcome::Processed { .. } => {}
            other => panic!("unexpected tick outcome {other:?}"),
        }
    }
    assert_eq!(*seen.lock().unwrap(), vec![0, 3, 6, 9]);
    assert_eq!(skipped, vec![1, 2, 4, 5, 7, 8]);
    let progress = session.progress();
    assert_eq!(progress.pulled, 10);
    assert_eq!(progress.total, Some(10));
    assert_eq!(progress.fraction(), Some(1.0));
    assert_eq!(session.retained_frame().unwrap().index(), 9);
}

#[test]
fn camera_stopped_before_capture_rejects_submit() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let mut session = session_with(ScriptedDetector::default());
    let camera = CameraSource::new(
        Box::new(MemoryReader::new(frames(3)).unbounded()),
        session.stop_signal(),
    );
    session.start(Box::new(camera), SourceKind::Camera).unwrap();
    session.stop();
    assert_eq!(session.state(), SessionState::Stopped);

    let err = session
        .submit(&fields("https://maps.app.goo.gl/xyz"), &mut store)
        .unwrap_err();
    assert!(matches!(err, SubmitError::NoCapturedFrame));
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(!dir.path().join(LOG_FILE).exists());
}

#[test]
fn external_stop_ends_camera_at_next_tick() {
    let mut session = session_with(ScriptedDetector::default());
    let stop = session.stop_signal();
    let camera = CameraSource::new(
        Box::new(MemoryReader::new(frames(5)).unbounded()),
        session.stop_signal(),
    );
    session.start(Box::new(camera), SourceKind::Camera).unwrap();
    assert_eq!(session.progress().fraction(), None);
    assert!(matches!(session.tick(), TickOutcome::Processed { index: 0, .. }));
    stop.stop();
    assert_eq!(session.tick(), TickOutcome::Ended(StreamEnd::Stopped));
    assert_eq!(session.retained_frame().unwrap().index(), 0);
    assert_eq!(session.progress().pulled, 1);
}

#[test]
fn device_failure_keeps_retained_frame() {
    let mut session = session_with(ScriptedDetector::default());
    let camera = CameraSource::new(
        Box::new(MemoryReader::new(frames(2)).unbounded().failing_at_end("usb unplugged")),
        session.stop_signal(),
    );
    session.start(Box::new(camera), SourceKind::Camera).unwrap();
    let end = session.run_to_end().unwrap();
    assert!(matches!(end, StreamEnd::Error(ref msg) if msg.contains("usb unplugged")));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.retained_frame().unwrap().index(), 1);
    assert!(session.warning().unwrap().contains("usb unplugged"));
}

#[test]
fn inference_failure_skips_only_that_frame() {
    let mut session = session_with(ScriptedDetector {
        seen: Arc::default(),
        fail_on: Some(2),
    });
    let source = VideoSource::new(Box::new(MemoryReader::new(frames(3))), 1);
    session.start(Box::new(source), SourceKind::Video).unwrap();
    assert!(matches!(session.tick(), TickOutcome::Processed { index: 0, .. }));
    assert!(matches!(session.tick(), TickOutcome::Processed { index: 1, .. }));
    assert_eq!(session.tick(), TickOutcome::InferenceFailed { index: 2 });
    assert_eq!(session.tick(), TickOutcome::Ended(StreamEnd::Exhausted));
    assert_eq!(session.retained_frame().unwrap().index(), 1);
    assert_eq!(session.progress().pulled, 3);
}

#[test]
fn video_report_without_frame_uses_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let mut session = session_with(ScriptedDetector::default());
    let source = VideoSource::new(Box::new(MemoryReader::new(Vec::new())), 1);
    session.start(Box::new(source), SourceKind::Video).unwrap();
    assert_eq!(session.run_to_end(), Some(StreamEnd::Exhausted));

    let receipt = session
        .submit(&fields("https://www.google.com/maps/place/x"), &mut store)
        .unwrap();
    assert_eq!(receipt.image_path, IMAGE_PATH_SENTINEL);
}

#[test]
fn events_outside_their_state_are_no_ops() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReportStore::open(dir.path()).unwrap();
    let mut session = session_with(ScriptedDetector::default());

    assert_eq!(session.tick(), TickOutcome::Idle);
    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(matches!(
        session.submit(&fields("https://maps.app.goo.gl/xyz"), &mut store),
        Err(SubmitError::InvalidState(SessionState::Idle))
    ));

    session
        .start(Box::new(ImageSource::from_image(road(16, 16))), SourceKind::Image)
        .unwrap();
    assert!(matches!(
        session.start(Box::new(ImageSource::from_image(road(8, 8))), SourceKind::Image),
        Err(StartError::AlreadyStreaming)
    ));
    assert!(matches!(
        session.submit(&fields("https://maps.app.goo.gl/xyz"), &mut store),
        Err(SubmitError::InvalidState(SessionState::Streaming))
    ));
    session.run_to_end();
    // Repeated ticks after the end leave the retained frame alone.
    assert_eq!(session.tick(), TickOutcome::Idle);
    assert_eq!(session.retained_frame().unwrap().pixels().width(), 16);

    session
        .submit(&fields("https://maps.app.goo.gl/xyz"), &mut store)
        .unwrap();
    assert!(matches!(
        session.submit(&fields("https://maps.app.goo.gl/xyz"), &mut store),
        Err(SubmitError::InvalidState(SessionState::Persisted))
    ));
    assert_eq!(row_count(dir.path()), 1);

    session.reset();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.retained_frame().is_none());
    assert_eq!(session.progress(), Progress::default());
}

#[test]
fn restart_clears_previous_frame() {
    let mut session = session_with(ScriptedDetector::default());
    session
        .start(Box::new(ImageSource::from_image(road(16, 16))), SourceKind::Image)
        .unwrap();
    session.run_to_end();
    assert!(session.retained_frame().is_some());

    let source = VideoSource::new(Box::new(MemoryReader::new(frames(2))), 5);
    session.start(Box::new(source), SourceKind::Video).unwrap();
    assert!(session.retained_frame().is_none());
    assert_eq!(session.progress().pulled, 0);
}
