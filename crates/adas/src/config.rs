//! Proximity policy configuration

use serde::{Deserialize, Serialize};

/// Frame width the proximity heuristic was calibrated against.
///
/// Deliberately separate from the detector input size (300): the two
/// values differ and the heuristic normalizes by this one.
pub const REFERENCE_WIDTH: f32 = 320.0;

/// Minimum detection confidence to track a detection
pub const MINIMUM_CONFIDENCE: f32 = 0.5;

/// Labels treated as vehicles by the class gate
pub const VEHICLE_LABELS: [&str; 3] = ["car", "truck", "bus"];

/// Coordinate space the heuristic evaluates boxes in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSpace {
    /// Boxes after remapping to the full camera frame
    #[default]
    Frame,
    /// Boxes as the detector produced them
    Detector,
}

/// Proximity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Detection confidence threshold
    pub confidence_threshold: f32,

    /// Labels that pass the class gate
    pub vehicle_labels: Vec<String>,

    /// Calibration width used to normalize size and position
    pub reference_width: f32,

    /// Minimum width / reference_width ratio to be considered close
    pub min_size_ratio: f32,

    /// Normalized centre x must exceed this
    pub min_center_x: f32,

    /// Normalized centre y must stay below this
    pub max_center_y: f32,

    /// Which coordinate space the heuristic sees
    pub evaluation_space: EvaluationSpace,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: MINIMUM_CONFIDENCE,
            vehicle_labels: VEHICLE_LABELS.iter().map(|s| s.to_string()).collect(),
            reference_width: REFERENCE_WIDTH,
            min_size_ratio: 0.5,
            min_center_x: 0.3,
            max_center_y: 0.7,
            evaluation_space: EvaluationSpace::Frame,
        }
    }
}
