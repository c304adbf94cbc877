//! Tracker hand-off

use adas::Detection;
use tracing::{debug, info};

/// Multi-object tracker fed with each processed frame's detections.
///
/// Boxes are in frame space. Association across frames and overlay
/// rendering belong to the implementation.
pub trait Tracker: Send {
    fn track_results(&mut self, detections: &[Detection], sequence: u64);
}

/// Tracker that only logs what it receives
#[derive(Debug, Default)]
pub struct LoggingTracker {
    last_sequence: Option<u64>,
}

impl LoggingTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracker for LoggingTracker {
    fn track_results(&mut self, detections: &[Detection], sequence: u64) {
        if let Some(last) = self.last_sequence {
            debug!("Tracking frame {} ({} frames since last)", sequence, sequence.saturating_sub(last));
        }
        for d in detections {
            if let Some(b) = d.location {
                info!(
                    "frame {}: {} {:.2} [{:.0}, {:.0}, {:.0}, {:.0}]",
                    sequence, d.label, d.confidence, b.left, b.top, b.right, b.bottom
                );
            }
        }
        self.last_sequence = Some(sequence);
    }
}
