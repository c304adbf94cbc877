//! Frame ↔ detector coordinate transforms

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::detection::BoundingBox;
use crate::TransformError;

/// 2x3 affine matrix
///
/// ```text
/// | a11 a12 b1 |
/// | a21 a22 b2 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineMatrix {
    pub a11: f32,
    pub a12: f32,
    pub b1: f32,
    pub a21: f32,
    pub a22: f32,
    pub b2: f32,
}

impl AffineMatrix {
    pub fn identity() -> Self {
        Self::scale(1.0, 1.0)
    }

    pub fn translation(dx: f32, dy: f32) -> Self {
        Self {
            a11: 1.0,
            a12: 0.0,
            b1: dx,
            a21: 0.0,
            a22: 1.0,
            b2: dy,
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a11: sx,
            a12: 0.0,
            b1: 0.0,
            a21: 0.0,
            a22: sy,
            b2: 0.0,
        }
    }

    /// Rotation by a quarter-turn multiple, exact in floating point.
    ///
    /// `degrees` must already be normalized into {0, 90, 180, 270}.
    fn quarter_turn(degrees: u32) -> Self {
        let (cos, sin) = match degrees {
            90 => (0.0, 1.0),
            180 => (-1.0, 0.0),
            270 => (0.0, -1.0),
            _ => (1.0, 0.0),
        };
        Self {
            a11: cos,
            a12: -sin,
            b1: 0.0,
            a21: sin,
            a22: cos,
            b2: 0.0,
        }
    }

    /// Matrix product `self * other` (apply `other` first)
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            a11: self.a11 * other.a11 + self.a12 * other.a21,
            a12: self.a11 * other.a12 + self.a12 * other.a22,
            b1: self.a11 * other.b1 + self.a12 * other.b2 + self.b1,
            a21: self.a21 * other.a11 + self.a22 * other.a21,
            a22: self.a21 * other.a12 + self.a22 * other.a22,
            b2: self.a21 * other.b1 + self.a22 * other.b2 + self.b2,
        }
    }

    /// Append `next` after this transform
    fn then(self, next: Self) -> Self {
        next.compose(&self)
    }

    pub fn determinant(&self) -> f32 {
        self.a11 * self.a22 - self.a12 * self.a21
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-10 {
            return None;
        }

        let inv_det = 1.0 / det;
        Some(Self {
            a11: self.a22 * inv_det,
            a12: -self.a12 * inv_det,
            b1: (self.a12 * self.b2 - self.a22 * self.b1) * inv_det,
            a21: -self.a21 * inv_det,
            a22: self.a11 * inv_det,
            b2: (self.a21 * self.b1 - self.a11 * self.b2) * inv_det,
        })
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a11 * x + self.a12 * y + self.b1,
            self.a21 * x + self.a22 * y + self.b2,
        )
    }

    /// Map all four corners and return their axis-aligned bounds
    pub fn map_rect(&self, rect: &BoundingBox) -> BoundingBox {
        let corners = [
            self.transform_point(rect.left, rect.top),
            self.transform_point(rect.right, rect.top),
            self.transform_point(rect.right, rect.bottom),
            self.transform_point(rect.left, rect.bottom),
        ];

        let (mut left, mut top) = corners[0];
        let (mut right, mut bottom) = corners[0];
        for &(x, y) in &corners[1..] {
            left = left.min(x);
            right = right.max(x);
            top = top.min(y);
            bottom = bottom.max(y);
        }
        BoundingBox::new(left, top, right, bottom)
    }

    /// Row-major 3x3 homogeneous form
    pub fn to_homogeneous(&self) -> [f32; 9] {
        [
            self.a11, self.a12, self.b1, self.a21, self.a22, self.b2, 0.0, 0.0, 1.0,
        ]
    }
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transform pair between frame space and detector input space.
///
/// Built once per preview configuration and shared read-only by every
/// frame processed under that configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    to_detector_space: AffineMatrix,
    to_frame_space: AffineMatrix,
    source_size: (u32, u32),
    target_size: (u32, u32),
    rotation: u32,
    maintain_aspect: bool,
}

impl FrameTransform {
    /// Build the frame → detector transform and its inverse.
    ///
    /// Rotation happens about the source centre, the rotated frame is then
    /// scaled to the target (per axis unless `maintain_aspect`), and finally
    /// re-centred in the target when a rotation was applied.
    pub fn new(
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
        rotation_degrees: i32,
        maintain_aspect: bool,
    ) -> Result<Self, TransformError> {
        if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
            return Err(TransformError::InvalidDimensions {
                src_width,
                src_height,
                dst_width,
                dst_height,
            });
        }
        if rotation_degrees % 90 != 0 {
            return Err(TransformError::UnsupportedRotation(rotation_degrees));
        }
        let rotation = rotation_degrees.rem_euclid(360) as u32;

        let mut matrix = AffineMatrix::identity();
        if rotation != 0 {
            matrix = matrix
                .then(AffineMatrix::translation(
                    -(src_width as f32) / 2.0,
                    -(src_height as f32) / 2.0,
                ))
                .then(AffineMatrix::quarter_turn(rotation));
        }

        let transpose = rotation % 180 == 90;
        let (in_width, in_height) = if transpose {
            (src_height, src_width)
        } else {
            (src_width, src_height)
        };

        if in_width != dst_width || in_height != dst_height {
            let scale_x = dst_width as f32 / in_width as f32;
            let scale_y = dst_height as f32 / in_height as f32;
            matrix = if maintain_aspect {
                let s = scale_x.max(scale_y);
                matrix.then(AffineMatrix::scale(s, s))
            } else {
                matrix.then(AffineMatrix::scale(scale_x, scale_y))
            };
        }

        if rotation != 0 {
            matrix = matrix.then(AffineMatrix::translation(
                dst_width as f32 / 2.0,
                dst_height as f32 / 2.0,
            ));
        }

        let inverse = matrix.inverse().ok_or(TransformError::Singular)?;

        info!(
            "Frame transform {}x{} -> {}x{} (rotation {}°, maintain aspect: {})",
            src_width, src_height, dst_width, dst_height, rotation, maintain_aspect
        );
        debug!("to_detector_space = {:?}", matrix);

        Ok(Self {
            to_detector_space: matrix,
            to_frame_space: inverse,
            source_size: (src_width, src_height),
            target_size: (dst_width, dst_height),
            rotation,
            maintain_aspect,
        })
    }

    /// Square detector input of `size` pixels
    pub fn for_detector(
        src_width: u32,
        src_height: u32,
        size: u32,
        rotation_degrees: i32,
        maintain_aspect: bool,
    ) -> Result<Self, TransformError> {
        Self::new(src_width, src_height, size, size, rotation_degrees, maintain_aspect)
    }

    pub fn to_detector_space(&self) -> &AffineMatrix {
        &self.to_detector_space
    }

    pub fn to_frame_space(&self) -> &AffineMatrix {
        &self.to_frame_space
    }

    pub fn source_size(&self) -> (u32, u32) {
        self.source_size
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    /// Normalized rotation in degrees
    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    pub fn maintain_aspect(&self) -> bool {
        self.maintain_aspect
    }

    pub fn detector_rect(&self, frame_rect: &BoundingBox) -> BoundingBox {
        self.to_detector_space.map_rect(frame_rect)
    }

    pub fn frame_rect(&self, detector_rect: &BoundingBox) -> BoundingBox {
        self.to_frame_space.map_rect(detector_rect)
    }
}
