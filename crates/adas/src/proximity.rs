//! Vehicle proximity heuristic

use tracing::debug;

use crate::config::ProximityConfig;
use crate::detection::{AlertDecision, BoundingBox, Detection};

/// Size and position of a box relative to the reference width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityMeasurement {
    /// Box width over the reference width
    pub size_ratio: f32,
    /// Normalized centre x
    pub x: f32,
    /// Normalized centre y
    pub y: f32,
}

impl ProximityMeasurement {
    pub fn of(bbox: &BoundingBox, reference_width: f32) -> Self {
        let (mid_x, mid_y) = bbox.center();
        Self {
            size_ratio: bbox.width() / reference_width,
            x: mid_x / reference_width,
            y: mid_y / reference_width,
        }
    }
}

/// Flags vehicles that are large and ahead-right in the frame.
///
/// Pure per-detection evaluation: no state is kept between calls, so a
/// single noisy frame can raise an alert and the next frame does not
/// clear it explicitly.
#[derive(Debug, Clone)]
pub struct ProximityHeuristic {
    config: ProximityConfig,
}

impl ProximityHeuristic {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn is_vehicle(&self, label: &str) -> bool {
        self.config.vehicle_labels.iter().any(|l| l == label)
    }

    /// Evaluate one detection against the class, size and position gates
    pub fn evaluate(&self, detection: &Detection) -> AlertDecision {
        let label = detection.label.as_str();
        if !self.is_vehicle(label) {
            return AlertDecision::no_alert(label);
        }
        let Some(bbox) = detection.location else {
            return AlertDecision::no_alert(label);
        };

        let m = ProximityMeasurement::of(&bbox, self.config.reference_width);
        debug!(
            "{}: size_ratio={:.3} x={:.3} y={:.3}",
            label, m.size_ratio, m.x, m.y
        );

        let too_close = m.size_ratio >= self.config.min_size_ratio
            && m.x > self.config.min_center_x
            && m.y < self.config.max_center_y;

        AlertDecision {
            too_close,
            label: label.to_string(),
        }
    }
}

impl Default for ProximityHeuristic {
    fn default() -> Self {
        Self::new(ProximityConfig::default())
    }
}
