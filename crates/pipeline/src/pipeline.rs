//! Pipeline assembly and lifecycle

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use adas::{FrameTransform, ProximityHeuristic};
use alerting::{AlertDispatcher, AlertHandle};
use camera_capture::CaptureBuffer;
use inference_engine::{DetectionStage, ObjectDetector};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::buffer::BufferPool;
use crate::config::PipelineConfig;
use crate::gate::{Admission, FrameAdmissionGate};
use crate::state::PipelineState;
use crate::tracker::Tracker;
use crate::ui::{self, UiReceiver};
use crate::worker::{DetectionWorker, WorkerCommand};
use crate::PipelineError;

/// A running proximity pipeline: admission gate on the caller's side,
/// detection worker on its own thread.
pub struct Pipeline {
    gate: FrameAdmissionGate,
    state: Arc<PipelineState>,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Wire the pipeline and start the detection worker.
    ///
    /// Returns the receiving end of the UI event channel.
    pub fn start(
        config: &PipelineConfig,
        detector: Box<dyn ObjectDetector>,
        tracker: Box<dyn Tracker>,
        alerts: AlertDispatcher,
    ) -> Result<(Self, UiReceiver), PipelineError> {
        let camera = &config.camera;
        let input_size = config.detector.input_size;

        if config.proximity.reference_width != input_size as f32 {
            warn!(
                "Proximity reference width {} differs from detector input size {}",
                config.proximity.reference_width, input_size
            );
        }

        let rotation = camera.relative_rotation();
        let transform = FrameTransform::for_detector(
            camera.width,
            camera.height,
            input_size,
            rotation,
            config.detector.maintain_aspect,
        )?;
        let state = Arc::new(PipelineState::new(transform, alerts.into_handle()));

        let (ui_tx, ui_rx) = ui::channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let pool = BufferPool::new();

        let worker = DetectionWorker {
            stage: DetectionStage::new(detector, input_size),
            heuristic: ProximityHeuristic::new(config.proximity.clone()),
            tracker,
            state: Arc::clone(&state),
            pool: pool.clone(),
            ui: ui_tx.clone(),
        };
        let handle = worker
            .spawn(command_rx)
            .map_err(|e| PipelineError::Spawn(e.to_string()))?;

        let gate = FrameAdmissionGate::new(
            Arc::clone(&state),
            command_tx,
            ui_tx,
            pool,
            input_size,
            config.detector.maintain_aspect,
            rotation,
        );

        info!(
            "Pipeline started: preview {}x{}, detector {}x{}, rotation {}",
            camera.width, camera.height, input_size, input_size, rotation
        );

        Ok((
            Self {
                gate,
                state,
                worker: Some(handle),
            },
            ui_rx,
        ))
    }

    /// Offer one camera frame to the pipeline
    pub fn admit(&mut self, buffer: CaptureBuffer<'_>) -> Result<Admission, PipelineError> {
        self.gate.admit(buffer)
    }

    /// Preview size or orientation changed
    pub fn reconfigure(
        &mut self,
        width: u32,
        height: u32,
        rotation: i32,
    ) -> Result<(), PipelineError> {
        self.gate.reconfigure(width, height, rotation)
    }

    pub fn set_use_nnapi(&self, enabled: bool) -> Result<(), PipelineError> {
        self.gate.set_use_nnapi(enabled)
    }

    pub fn set_num_threads(&self, num_threads: usize) -> Result<(), PipelineError> {
        self.gate.set_num_threads(num_threads)
    }

    /// Handle for the UI "stop" control
    pub fn alerts(&self) -> AlertHandle {
        self.state.alerts().clone()
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Duration of the last completed inference call
    pub fn last_processing_time(&self) -> Duration {
        self.state.last_processing_time()
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Let the in-flight frame finish, stop the worker and silence speech
    pub fn shutdown(mut self) -> Result<(), PipelineError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), PipelineError> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };

        // A terminated worker has already dropped its receiver.
        let _ = self.gate.send(WorkerCommand::Shutdown);
        let joined = handle.join();
        self.state.alerts().cancel();
        info!("Pipeline stopped");

        joined.map_err(|_| PipelineError::WorkerPanicked)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Pipeline shutdown: {}", e);
        }
    }
}
