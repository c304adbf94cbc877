//! Detection stage: forward crop plus timed inference

use std::time::{Duration, Instant};

use adas::{Detection, FrameTransform};
use camera_capture::VideoFrame;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use tracing::debug;

use crate::detector::ObjectDetector;
use crate::InferenceError;

/// Result of running one frame through the detector
#[derive(Debug)]
pub struct StageOutput {
    /// Detections in detector input space
    pub detections: Vec<Detection>,
    /// Wall-clock duration of the inference call alone
    pub inference_time: Duration,
    /// The frame's pixel buffer, handed back for reuse
    pub buffer: Vec<u8>,
}

/// Crops frames into detector space and runs the detector on them
pub struct DetectionStage {
    detector: Box<dyn ObjectDetector>,
    crop: RgbImage,
}

impl DetectionStage {
    pub fn new(detector: Box<dyn ObjectDetector>, input_size: u32) -> Self {
        Self {
            detector,
            crop: RgbImage::new(input_size, input_size),
        }
    }

    pub fn detector_mut(&mut self) -> &mut dyn ObjectDetector {
        self.detector.as_mut()
    }

    /// Crop `frame` with `transform` and run the detector on the result.
    ///
    /// Only the detector call is timed. Detector errors are returned
    /// unchanged; the caller decides whether the detector can continue.
    pub fn detect(
        &mut self,
        frame: VideoFrame,
        transform: &FrameTransform,
    ) -> Result<StageOutput, InferenceError> {
        let expected = transform.source_size();
        if (frame.width, frame.height) != expected {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{}x{}", expected.0, expected.1),
                actual: format!("{}x{}", frame.width, frame.height),
            });
        }

        let target = transform.target_size();
        if self.crop.dimensions() != target {
            self.crop = RgbImage::new(target.0, target.1);
        }

        let image = frame.into_image().map_err(|e| InferenceError::InvalidInputShape {
            expected: "RGB24 frame".into(),
            actual: e.to_string(),
        })?;
        let projection = Projection::from_matrix(transform.to_detector_space().to_homogeneous())
            .ok_or_else(|| InferenceError::InferenceFailed("crop transform is singular".into()))?;
        warp_into(
            &image,
            &projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
            &mut self.crop,
        );

        let start = Instant::now();
        let detections = self.detector.recognize_image(&self.crop)?;
        let inference_time = start.elapsed();
        debug!(
            "Inference produced {} detections in {:?}",
            detections.len(),
            inference_time
        );

        Ok(StageOutput {
            detections,
            inference_time,
            buffer: image.into_raw(),
        })
    }
}
