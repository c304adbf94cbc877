//! Advanced Driver Assistance System (ADAS)
//!
//! Detection geometry and forward proximity warning:
//! - Frame ↔ detector coordinate transforms
//! - Confidence filtering and remapping of detections
//! - Vehicle proximity heuristic

pub mod config;
pub mod detection;
pub mod filter;
pub mod proximity;
pub mod transform;

pub use config::{EvaluationSpace, ProximityConfig, MINIMUM_CONFIDENCE, REFERENCE_WIDTH};
pub use detection::{AlertDecision, BoundingBox, Detection};
pub use filter::{filter_and_remap, filter_confident, remap_to_frame};
pub use proximity::{ProximityHeuristic, ProximityMeasurement};
pub use transform::{AffineMatrix, FrameTransform};

use thiserror::Error;

/// Transform construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Invalid transform dimensions {src_width}x{src_height} -> {dst_width}x{dst_height}")]
    InvalidDimensions {
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("Rotation must be a multiple of 90 degrees, got {0}")]
    UnsupportedRotation(i32),

    #[error("Transform is not invertible")]
    Singular,
}
