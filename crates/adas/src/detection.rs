//! Detection results (vehicles, pedestrians, anything the model labels)

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Centre point (x, y)
    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }
}

/// A scored, labeled detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label from the model's label map
    pub label: String,

    /// Detection confidence (0.0 to 1.0)
    pub confidence: f32,

    /// Location in the coordinate space of whoever produced it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<BoundingBox>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, location: Option<BoundingBox>) -> Self {
        Self {
            label: label.into(),
            confidence,
            location,
        }
    }

    /// Same detection with its box replaced wholesale
    pub fn with_location(self, location: BoundingBox) -> Self {
        Self {
            location: Some(location),
            ..self
        }
    }
}

/// Per-detection proximity verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDecision {
    /// Whether the object is judged dangerously close
    pub too_close: bool,
    /// Label of the evaluated detection
    pub label: String,
}

impl AlertDecision {
    pub fn no_alert(label: impl Into<String>) -> Self {
        Self {
            too_close: false,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_geometry() {
        let b = BoundingBox::new(100.0, 50.0, 420.0, 200.0);
        assert_eq!(b.width(), 320.0);
        assert_eq!(b.height(), 150.0);
        assert_eq!(b.center(), (260.0, 125.0));
    }

    #[test]
    fn test_with_location_replaces_box() {
        let d = Detection::new("car", 0.8, Some(BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
        let moved = d.with_location(BoundingBox::new(5.0, 6.0, 7.0, 8.0));
        assert_eq!(moved.label, "car");
        assert_eq!(moved.confidence, 0.8);
        assert_eq!(moved.location, Some(BoundingBox::new(5.0, 6.0, 7.0, 8.0)));
    }
}
