//! End-to-end pipeline behaviour with a detector the test can hold open

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use adas::{BoundingBox, Detection, EvaluationSpace};
use alerting::{AlertConfig, AlertDispatcher};
use camera_capture::{CaptureBuffer, PixelFormat};
use image::RgbImage;
use inference_engine::{InferenceError, ObjectDetector, ScriptedDetector};
use pipeline::{Admission, Pipeline, PipelineConfig, PipelineError, Tracker, UiEvent, UiReceiver};

const WAIT: Duration = Duration::from_secs(10);

/// Blocks inside `recognize_image` until the test lets it go
struct GatedDetector {
    started: mpsc::Sender<()>,
    proceed: mpsc::Receiver<()>,
    detections: Vec<Detection>,
    calls: Arc<AtomicUsize>,
    use_nnapi: Arc<AtomicBool>,
}

impl ObjectDetector for GatedDetector {
    fn recognize_image(&mut self, _image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.send(());
        let _ = self.proceed.recv_timeout(WAIT);
        Ok(self.detections.clone())
    }

    fn set_use_nnapi(&mut self, enabled: bool) {
        self.use_nnapi.store(enabled, Ordering::SeqCst);
    }

    fn set_num_threads(&mut self, _num_threads: usize) {}
}

struct DetectorControl {
    started: mpsc::Receiver<()>,
    proceed: mpsc::Sender<()>,
    calls: Arc<AtomicUsize>,
    use_nnapi: Arc<AtomicBool>,
}

impl DetectorControl {
    /// Wait for the detector to be entered, then let it finish
    fn run_one(&self) {
        self.started
            .recv_timeout(WAIT)
            .expect("detector was not invoked");
        self.proceed.send(()).unwrap();
    }
}

type Tracked = Arc<Mutex<Vec<(u64, Vec<Detection>)>>>;

struct RecordingTracker(Tracked);

impl Tracker for RecordingTracker {
    fn track_results(&mut self, detections: &[Detection], sequence: u64) {
        self.0.lock().unwrap().push((sequence, detections.to_vec()));
    }
}

fn gated(detections: Vec<Detection>) -> (GatedDetector, DetectorControl) {
    let (started_tx, started_rx) = mpsc::channel();
    let (proceed_tx, proceed_rx) = mpsc::channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let use_nnapi = Arc::new(AtomicBool::new(false));
    let detector = GatedDetector {
        started: started_tx,
        proceed: proceed_rx,
        detections,
        calls: calls.clone(),
        use_nnapi: use_nnapi.clone(),
    };
    let control = DetectorControl {
        started: started_rx,
        proceed: proceed_tx,
        calls,
        use_nnapi,
    };
    (detector, control)
}

/// Square preview, no rotation
fn square_config(size: u32) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.camera.width = size;
    config.camera.height = size;
    config.camera.sensor_orientation = 0;
    config.camera.screen_orientation = 0;
    config
}

fn start(
    config: &PipelineConfig,
    detector: Box<dyn ObjectDetector>,
) -> (Pipeline, UiReceiver, Tracked) {
    let tracked = Tracked::default();
    let alerts = AlertDispatcher::logging(AlertConfig::default());
    let (pipeline, ui) = Pipeline::start(
        config,
        detector,
        Box::new(RecordingTracker(tracked.clone())),
        alerts,
    )
    .unwrap();
    (pipeline, ui, tracked)
}

fn admit(pipeline: &mut Pipeline, width: u32, height: u32) -> Result<Admission, PipelineError> {
    let data = vec![0u8; (width * height * 3) as usize];
    let buffer = CaptureBuffer::new(&data, width, height, PixelFormat::Rgb24).unwrap();
    pipeline.admit(buffer)
}

/// Block until the worker reports a finished frame
fn wait_for_completion(ui: &mut UiReceiver) -> String {
    loop {
        match ui.blocking_recv() {
            Some(UiEvent::InferenceTime(elapsed)) => return elapsed,
            Some(UiEvent::InvalidateOverlay) => continue,
            None => panic!("UI channel closed"),
        }
    }
}

fn scenario_a_car(confidence: f32) -> Detection {
    Detection::new("car", confidence, Some(BoundingBox::new(100.0, 50.0, 420.0, 200.0)))
}

#[test]
fn test_frames_while_busy_are_dropped() {
    let (detector, control) = gated(Vec::new());
    let (mut pipeline, mut ui, tracked) = start(&square_config(300), Box::new(detector));

    assert_eq!(admit(&mut pipeline, 300, 300).unwrap(), Admission::Accepted { sequence: 1 });
    control.started.recv_timeout(WAIT).unwrap();

    assert!(pipeline.is_busy());
    assert_eq!(admit(&mut pipeline, 300, 300).unwrap(), Admission::Dropped { sequence: 2 });

    control.proceed.send(()).unwrap();
    let elapsed = wait_for_completion(&mut ui);
    assert!(elapsed.ends_with("ms"));
    assert!(!pipeline.is_busy());

    assert_eq!(admit(&mut pipeline, 300, 300).unwrap(), Admission::Accepted { sequence: 3 });
    control.run_one();
    wait_for_completion(&mut ui);

    assert_eq!(control.calls.load(Ordering::SeqCst), 2);
    let sequences: Vec<u64> = tracked.lock().unwrap().iter().map(|(s, _)| *s).collect();
    assert_eq!(sequences, vec![1, 3]);

    pipeline.shutdown().unwrap();
}

#[test]
fn test_capture_buffer_released_whether_accepted_or_dropped() {
    let (detector, control) = gated(Vec::new());
    let (mut pipeline, mut ui, _tracked) = start(&square_config(300), Box::new(detector));
    let released = AtomicUsize::new(0);
    let data = vec![0u8; 300 * 300 * 3];

    for _ in 0..3 {
        let buffer = CaptureBuffer::new(&data, 300, 300, PixelFormat::Rgb24)
            .unwrap()
            .with_release(|| {
                released.fetch_add(1, Ordering::SeqCst);
            });
        pipeline.admit(buffer).unwrap();
    }
    assert_eq!(released.load(Ordering::SeqCst), 3);

    control.run_one();
    wait_for_completion(&mut ui);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_close_car_fires_alert_and_reaches_tracker() {
    let (detector, control) = gated(vec![scenario_a_car(0.9)]);
    let (mut pipeline, mut ui, tracked) = start(&square_config(300), Box::new(detector));

    admit(&mut pipeline, 300, 300).unwrap();
    control.run_one();
    wait_for_completion(&mut ui);

    assert_eq!(pipeline.alerts().fired(), 1);
    let tracked = tracked.lock().unwrap();
    let (sequence, detections) = &tracked[0];
    assert_eq!(*sequence, 1);
    assert_eq!(detections.len(), 1);
    let b = detections[0].location.unwrap();
    assert!((b.left - 100.0).abs() < 1e-3 && (b.right - 420.0).abs() < 1e-3);
    drop(tracked);

    pipeline.shutdown().unwrap();
}

#[test]
fn test_every_close_vehicle_in_a_frame_alerts() {
    let truck = Detection::new("truck", 0.8, Some(BoundingBox::new(60.0, 40.0, 380.0, 210.0)));
    let (detector, control) = gated(vec![scenario_a_car(0.9), truck]);
    let (mut pipeline, mut ui, tracked) = start(&square_config(300), Box::new(detector));

    admit(&mut pipeline, 300, 300).unwrap();
    control.run_one();
    wait_for_completion(&mut ui);

    assert_eq!(pipeline.alerts().fired(), 2);
    assert_eq!(tracked.lock().unwrap()[0].1.len(), 2);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_overlay_redraws_coalesce_while_busy() {
    let (detector, control) = gated(Vec::new());
    let (mut pipeline, mut ui, _tracked) = start(&square_config(300), Box::new(detector));

    admit(&mut pipeline, 300, 300).unwrap();
    control.started.recv_timeout(WAIT).unwrap();
    for _ in 0..50 {
        assert!(!admit(&mut pipeline, 300, 300).unwrap().is_accepted());
    }
    control.proceed.send(()).unwrap();
    // The worker's own redraw request precedes the flight release.
    let deadline = std::time::Instant::now() + WAIT;
    while pipeline.is_busy() {
        assert!(std::time::Instant::now() < deadline, "detection never finished");
        std::thread::sleep(Duration::from_millis(1));
    }

    let mut overlays = 0;
    loop {
        match ui.blocking_recv() {
            Some(UiEvent::InvalidateOverlay) => overlays += 1,
            Some(UiEvent::InferenceTime(_)) => break,
            None => panic!("UI channel closed"),
        }
    }
    assert_eq!(overlays, 1);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_low_confidence_dropped_before_heuristic() {
    let (detector, control) = gated(vec![scenario_a_car(0.49)]);
    let (mut pipeline, mut ui, tracked) = start(&square_config(300), Box::new(detector));

    admit(&mut pipeline, 300, 300).unwrap();
    control.run_one();
    wait_for_completion(&mut ui);

    assert_eq!(pipeline.alerts().fired(), 0);
    assert!(tracked.lock().unwrap()[0].1.is_empty());
    pipeline.shutdown().unwrap();
}

#[test]
fn test_evaluation_space_selects_boxes_seen_by_heuristic() {
    // A 600px preview halves into detector space. The box sits high in
    // detector space but below the hood line once scaled up to the frame.
    let mut config = square_config(600);

    let (detector, control) = gated(vec![scenario_a_car(0.9)]);
    let (mut pipeline, mut ui, _tracked) = start(&config, Box::new(detector));
    admit(&mut pipeline, 600, 600).unwrap();
    control.run_one();
    wait_for_completion(&mut ui);
    assert_eq!(pipeline.alerts().fired(), 0);
    pipeline.shutdown().unwrap();

    config.proximity.evaluation_space = EvaluationSpace::Detector;
    let (detector, control) = gated(vec![scenario_a_car(0.9)]);
    let (mut pipeline, mut ui, tracked) = start(&config, Box::new(detector));
    admit(&mut pipeline, 600, 600).unwrap();
    control.run_one();
    wait_for_completion(&mut ui);
    assert_eq!(pipeline.alerts().fired(), 1);

    // The tracker still receives frame-space boxes.
    let b = tracked.lock().unwrap()[0].1[0].location.unwrap();
    assert!((b.left - 200.0).abs() < 1e-3 && (b.right - 840.0).abs() < 1e-3);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_toggles_forwarded_to_detector() {
    let (detector, control) = gated(Vec::new());
    let (mut pipeline, mut ui, _tracked) = start(&square_config(300), Box::new(detector));

    pipeline.set_use_nnapi(true).unwrap();
    pipeline.set_num_threads(4).unwrap();
    admit(&mut pipeline, 300, 300).unwrap();
    control.run_one();
    wait_for_completion(&mut ui);

    assert!(control.use_nnapi.load(Ordering::SeqCst));
    pipeline.shutdown().unwrap();
}

#[test]
fn test_preview_size_change_rebuilds_transform() {
    let detector = ScriptedDetector::constant(Vec::new());
    let (mut pipeline, mut ui, _tracked) = start(&square_config(300), Box::new(detector));
    assert_eq!(pipeline.state().transform().source_size(), (300, 300));

    admit(&mut pipeline, 200, 100).unwrap();
    assert_eq!(pipeline.state().transform().source_size(), (200, 100));
    wait_for_completion(&mut ui);

    pipeline.reconfigure(300, 300, 90).unwrap();
    let transform = pipeline.state().transform();
    assert_eq!(transform.source_size(), (300, 300));
    assert_eq!(transform.rotation(), 90);
    pipeline.shutdown().unwrap();
}

struct FailingDetector;

impl ObjectDetector for FailingDetector {
    fn recognize_image(&mut self, _image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        Err(InferenceError::InferenceFailed("corrupt model state".into()))
    }

    fn set_use_nnapi(&mut self, _enabled: bool) {}

    fn set_num_threads(&mut self, _num_threads: usize) {}
}

#[test]
fn test_inference_fault_terminates_worker() {
    let (mut pipeline, _ui, tracked) = start(&square_config(300), Box::new(FailingDetector));
    assert!(admit(&mut pipeline, 300, 300).unwrap().is_accepted());

    // Until the worker stops the flight stays taken; once it is free
    // the queue must already refuse work.
    let mut terminated = false;
    for _ in 0..500 {
        match admit(&mut pipeline, 300, 300) {
            Err(PipelineError::WorkerTerminated) => {
                terminated = true;
                break;
            }
            Ok(Admission::Dropped { .. }) => std::thread::sleep(Duration::from_millis(10)),
            Ok(accepted) => panic!("frame queued to a stopped worker: {accepted:?}"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert!(terminated);
    assert!(!pipeline.is_busy());
    for _ in 0..3 {
        assert!(matches!(
            admit(&mut pipeline, 300, 300),
            Err(PipelineError::WorkerTerminated)
        ));
    }
    assert!(tracked.lock().unwrap().is_empty());
    pipeline.shutdown().unwrap();
}
