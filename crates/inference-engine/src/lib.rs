//! Object Detection Inference
//!
//! Wraps the opaque detector capability used by the proximity pipeline:
//! - `ObjectDetector` trait with tract-onnx and scripted backends
//! - `DetectionStage` that crops frames into detector space and times inference

mod config;
mod detector;
mod stage;
mod tract;

pub use config::{DetectorConfig, DETECTOR_INPUT_SIZE};
pub use detector::{create_detector, ObjectDetector, ScriptedDetector};
pub use stage::{DetectionStage, StageOutput};
pub use tract::{load_labels, TractSsdDetector};

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Label map load failed: {0}")]
    LabelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}
