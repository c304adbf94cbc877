//! Detector capability

use std::time::Duration;

use adas::{BoundingBox, Detection};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::tract::TractSsdDetector;
use crate::InferenceError;

/// Opaque object detector.
///
/// `recognize_image` receives an image already cropped to the detector's
/// input size and returns boxes in that image's pixel space. Calls may
/// block for as long as inference takes.
pub trait ObjectDetector: Send {
    fn recognize_image(&mut self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError>;

    fn set_use_nnapi(&mut self, enabled: bool);

    fn set_num_threads(&mut self, num_threads: usize);
}

/// Build the configured detector.
///
/// Errors here are load-time failures and are fatal to pipeline start-up.
pub fn create_detector(config: &DetectorConfig) -> Result<Box<dyn ObjectDetector>, InferenceError> {
    let mut detector: Box<dyn ObjectDetector> = if config.model_path.is_some() {
        Box::new(TractSsdDetector::load(config)?)
    } else {
        warn!("No detection model path configured. Using scripted detector.");
        Box::new(
            ScriptedDetector::demo(config.input_size)
                .with_latency(Duration::from_millis(config.scripted_latency_ms)),
        )
    };
    detector.set_num_threads(config.num_threads);
    detector.set_use_nnapi(config.use_nnapi);
    Ok(detector)
}

/// Detector that replays a fixed script of results, one entry per call
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    script: Vec<Vec<Detection>>,
    cursor: usize,
    latency: Option<Duration>,
    use_nnapi: bool,
    num_threads: usize,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script,
            num_threads: 1,
            ..Default::default()
        }
    }

    /// Return the same detections on every call
    pub fn constant(detections: Vec<Detection>) -> Self {
        Self::new(vec![detections])
    }

    /// Empty frame, a close car ahead-right, then a pedestrian
    pub fn demo(input_size: u32) -> Self {
        let s = input_size as f32 / 300.0;
        Self::new(vec![
            vec![],
            vec![Detection::new(
                "car",
                0.87,
                Some(BoundingBox::new(60.0 * s, 20.0 * s, 220.0 * s, 100.0 * s)),
            )],
            vec![
                Detection::new(
                    "person",
                    0.71,
                    Some(BoundingBox::new(30.0 * s, 120.0 * s, 70.0 * s, 230.0 * s)),
                ),
                Detection::new("car", 0.32, Some(BoundingBox::new(0.0, 0.0, 20.0 * s, 15.0 * s))),
            ],
        ])
    }

    /// Sleep this long inside every call to imitate a slow model
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.cursor
    }

    pub fn use_nnapi(&self) -> bool {
        self.use_nnapi
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}

impl ObjectDetector for ScriptedDetector {
    fn recognize_image(&mut self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        let results = if self.script.is_empty() {
            Vec::new()
        } else {
            self.script[self.cursor % self.script.len()].clone()
        };
        self.cursor += 1;
        debug!(
            "Scripted detector call {} on {}x{}: {} results",
            self.cursor,
            image.width(),
            image.height(),
            results.len()
        );
        Ok(results)
    }

    fn set_use_nnapi(&mut self, enabled: bool) {
        info!("Scripted detector: use_nnapi = {}", enabled);
        self.use_nnapi = enabled;
    }

    fn set_num_threads(&mut self, num_threads: usize) {
        info!("Scripted detector: num_threads = {}", num_threads);
        self.num_threads = num_threads;
    }
}
