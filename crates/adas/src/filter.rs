//! Confidence filtering and remapping into frame space

use tracing::debug;

use crate::detection::Detection;
use crate::transform::FrameTransform;

/// Keep detections that have a box and meet `threshold`, in input order
pub fn filter_confident(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    let total = detections.len();
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.location.is_some() && d.confidence >= threshold)
        .collect();
    debug!(
        "Kept {}/{} detections at confidence >= {}",
        kept.len(),
        total,
        threshold
    );
    kept
}

/// Replace every box with its frame-space counterpart
pub fn remap_to_frame(detections: Vec<Detection>, transform: &FrameTransform) -> Vec<Detection> {
    detections
        .into_iter()
        .filter_map(|d| {
            let location = d.location?;
            Some(d.with_location(transform.frame_rect(&location)))
        })
        .collect()
}

/// Filter by confidence, then map survivors back into frame space
pub fn filter_and_remap(
    detections: Vec<Detection>,
    threshold: f32,
    transform: &FrameTransform,
) -> Vec<Detection> {
    remap_to_frame(filter_confident(detections, threshold), transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use proptest::prelude::*;

    fn boxed(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, Some(BoundingBox::new(10.0, 10.0, 60.0, 40.0)))
    }

    #[test]
    fn test_drops_low_confidence() {
        let kept = filter_confident(vec![boxed("car", 0.49), boxed("bus", 0.5)], 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label, "bus");
    }

    #[test]
    fn test_drops_missing_box() {
        let kept = filter_confident(vec![Detection::new("car", 0.99, None)], 0.5);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_preserves_input_order() {
        let input = vec![boxed("truck", 0.9), boxed("car", 0.6), boxed("dog", 0.7)];
        let t = FrameTransform::for_detector(300, 300, 300, 0, false).unwrap();
        let labels: Vec<_> = filter_and_remap(input, 0.5, &t)
            .into_iter()
            .map(|d| d.label)
            .collect();
        assert_eq!(labels, vec!["truck", "car", "dog"]);
    }

    #[test]
    fn test_remap_scales_to_frame() {
        let t = FrameTransform::for_detector(600, 300, 300, 0, false).unwrap();
        let out = filter_and_remap(vec![boxed("car", 0.9)], 0.5, &t);
        let b = out[0].location.unwrap();
        assert!((b.left - 20.0).abs() < 1e-3);
        assert!((b.top - 10.0).abs() < 1e-3);
        assert!((b.right - 120.0).abs() < 1e-3);
        assert!((b.bottom - 40.0).abs() < 1e-3);
        assert_eq!(out[0].confidence, 0.9);
    }

    proptest! {
        #[test]
        fn prop_raising_threshold_never_grows_output(
            scores in prop::collection::vec(0.0f32..=1.0, 0..32),
            low in 0.0f32..=1.0,
            bump in 0.0f32..=1.0,
        ) {
            let detections: Vec<_> = scores.iter().map(|&s| boxed("car", s)).collect();
            let high = low + bump;
            let at_low = filter_confident(detections.clone(), low).len();
            let at_high = filter_confident(detections, high).len();
            prop_assert!(at_high <= at_low);
        }
    }
}
