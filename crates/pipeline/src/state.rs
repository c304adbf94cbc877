//! Process-wide pipeline state

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use adas::FrameTransform;
use alerting::AlertHandle;

use crate::single_flight::SingleFlight;

/// State shared by the admission gate and the detection worker
pub struct PipelineState {
    flight: SingleFlight,
    last_processing_ms: AtomicU64,
    transform: RwLock<Arc<FrameTransform>>,
    alerts: AlertHandle,
}

impl PipelineState {
    pub fn new(transform: FrameTransform, alerts: AlertHandle) -> Self {
        Self {
            flight: SingleFlight::new(),
            last_processing_ms: AtomicU64::new(0),
            transform: RwLock::new(Arc::new(transform)),
            alerts,
        }
    }

    pub fn flight(&self) -> &SingleFlight {
        &self.flight
    }

    /// Whether a detection is in flight
    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    /// Current transform pair, shared read-only
    pub fn transform(&self) -> Arc<FrameTransform> {
        Arc::clone(&self.transform.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn set_transform(&self, transform: FrameTransform) {
        *self.transform.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(transform);
    }

    pub fn last_processing_time(&self) -> Duration {
        Duration::from_millis(self.last_processing_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn record_processing_time(&self, elapsed: Duration) {
        self.last_processing_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn alerts(&self) -> &AlertHandle {
        &self.alerts
    }
}
