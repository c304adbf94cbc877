//! Detector configuration

use serde::{Deserialize, Serialize};

/// Square input size of the prepackaged SSD model
pub const DETECTOR_INPUT_SIZE: u32 = 300;

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// ONNX model path; `None` runs the scripted demo detector
    pub model_path: Option<String>,

    /// Label map, one label per line
    pub labels_path: Option<String>,

    /// Detector input size in pixels
    pub input_size: u32,

    /// Model takes raw u8 pixels instead of normalized floats
    pub is_quantized: bool,

    /// Keep the aspect ratio when cropping into detector space
    pub maintain_aspect: bool,

    /// Worker threads requested from the backend
    pub num_threads: usize,

    /// Request the hardware accelerator delegate
    pub use_nnapi: bool,

    /// Artificial latency of the scripted detector (ms)
    pub scripted_latency_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            input_size: DETECTOR_INPUT_SIZE,
            is_quantized: true,
            maintain_aspect: false,
            num_threads: 1,
            use_nnapi: false,
            scripted_latency_ms: 120,
        }
    }
}
