//! Pipeline configuration
//!
//! Sources, later ones overriding earlier ones:
//! - built-in defaults
//! - an optional TOML/JSON/YAML file
//! - `PROXIMITY__*` environment variables, e.g. `PROXIMITY__CAMERA__FPS=15`

use std::path::Path;

use adas::ProximityConfig;
use alerting::AlertConfig;
use camera_capture::CameraConfig;
use ::config::{Config, Environment, File};
use inference_engine::DetectorConfig;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PROXIMITY";

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub proximity: ProximityConfig,
    pub alert: AlertConfig,

    /// Maximum tracing level
    pub log_level: String,

    /// Stop the demo after this many camera frames
    pub max_frames: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            detector: DetectorConfig::default(),
            proximity: ProximityConfig::default(),
            alert: AlertConfig::default(),
            log_level: "info".to_string(),
            max_frames: None,
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| PipelineError::Config(e.to_string()))
    }
}
