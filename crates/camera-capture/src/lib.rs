//! Camera Capture Library for the proximity pipeline
//!
//! Provides the frame types and capture plumbing consumed by the
//! detection pipeline:
//! - Immutable RGB video frames with sequence numbers
//! - Borrowed capture buffers with a reuse acknowledgment
//! - A capture source trait and a synthetic road camera

pub mod frame;
pub mod source;

pub use frame::{PixelFormat, VideoFrame};
pub use source::{CaptureBuffer, CaptureSource, SyntheticCamera};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    Buffer { expected: usize, actual: usize },

    #[error("Invalid frame dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preview width requested from the camera
    pub width: u32,
    /// Preview height requested from the camera
    pub height: u32,
    /// Target FPS
    pub fps: u32,
    /// Sensor mounting rotation in degrees
    pub sensor_orientation: i32,
    /// Screen orientation in degrees
    pub screen_orientation: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            sensor_orientation: 90,
            screen_orientation: 0,
        }
    }
}

impl CameraConfig {
    /// Camera rotation relative to the screen canvas
    pub fn relative_rotation(&self) -> i32 {
        self.sensor_orientation - self.screen_orientation
    }

    /// Bytes in one RGB24 preview frame
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_rotation() {
        let config = CameraConfig {
            sensor_orientation: 270,
            screen_orientation: 90,
            ..Default::default()
        };
        assert_eq!(config.relative_rotation(), 180);
    }

    #[test]
    fn test_default_is_portrait_over_landscape_sensor() {
        let config = CameraConfig::default();
        assert_eq!(config.relative_rotation(), 90);
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(CameraConfig::default().frame_len(), 640 * 480 * 3);
    }
}
