//! Background detection worker

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use adas::{
    filter_confident, remap_to_frame, AlertDecision, Detection, EvaluationSpace, FrameTransform,
    ProximityHeuristic,
};
use alerting::FireOutcome;
use camera_capture::VideoFrame;
use inference_engine::{DetectionStage, InferenceError};
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::buffer::BufferPool;
use crate::single_flight::FlightGuard;
use crate::state::PipelineState;
use crate::tracker::Tracker;
use crate::ui::{UiEvent, UiSender};

/// One admitted frame and everything needed to process it
pub(crate) struct WorkItem {
    pub frame: VideoFrame,
    pub transform: Arc<FrameTransform>,
    pub guard: FlightGuard,
}

pub(crate) enum WorkerCommand {
    Detect(WorkItem),
    UseNnapi(bool),
    NumThreads(usize),
    Shutdown,
}

/// A failed detection, still holding the flight it ran under
struct DetectionFault {
    error: InferenceError,
    guard: FlightGuard,
}

/// Runs detection through alert dispatch for one frame at a time
pub(crate) struct DetectionWorker {
    pub stage: DetectionStage,
    pub heuristic: ProximityHeuristic,
    pub tracker: Box<dyn Tracker>,
    pub state: Arc<PipelineState>,
    pub pool: BufferPool,
    pub ui: UiSender,
}

impl DetectionWorker {
    pub fn spawn(
        self,
        commands: mpsc::UnboundedReceiver<WorkerCommand>,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("detection-worker".into())
            .spawn(move || self.run(commands))
    }

    fn run(mut self, mut commands: mpsc::UnboundedReceiver<WorkerCommand>) {
        info!("Detection worker started");
        while let Some(command) = commands.blocking_recv() {
            match command {
                WorkerCommand::Detect(item) => {
                    // A detector that failed mid-inference cannot be trusted again.
                    if let Err(DetectionFault { error, guard }) = self.process(item) {
                        error!("Detection failed, stopping worker: {}", error);
                        // Closed before the flight is freed: no later frame may be accepted.
                        commands.close();
                        drop(guard);
                        break;
                    }
                }
                WorkerCommand::UseNnapi(enabled) => {
                    self.stage.detector_mut().set_use_nnapi(enabled);
                }
                WorkerCommand::NumThreads(num_threads) => {
                    self.stage.detector_mut().set_num_threads(num_threads);
                }
                WorkerCommand::Shutdown => break,
            }
        }
        info!("Detection worker stopped");
    }

    fn process(&mut self, item: WorkItem) -> Result<(), DetectionFault> {
        let WorkItem {
            frame,
            transform,
            guard,
        } = item;
        let sequence = frame.sequence;
        debug!("Running detection on frame {}", sequence);

        let output = match self.stage.detect(frame, &transform) {
            Ok(output) => output,
            Err(error) => return Err(DetectionFault { error, guard }),
        };
        self.pool.give_back(output.buffer);
        self.state.record_processing_time(output.inference_time);
        histogram!("inference_latency_ms").record(output.inference_time.as_secs_f64() * 1000.0);

        let (tracked, decisions) = self.evaluate(output.detections, &transform);

        let mut fired = 0;
        for decision in decisions.iter().filter(|d| d.too_close) {
            if self.state.alerts().fire(&decision.label) == FireOutcome::Fired {
                fired += 1;
                counter!("proximity_alerts_total").increment(1);
            }
        }

        self.tracker.track_results(&tracked, sequence);
        self.ui.post(UiEvent::InvalidateOverlay);

        guard.release();

        debug!(
            "Frame {}: {} tracked, {} alerts, inference {:?}",
            sequence,
            tracked.len(),
            fired,
            output.inference_time
        );
        self.ui
            .post(UiEvent::InferenceTime(format!("{}ms", output.inference_time.as_millis())));
        Ok(())
    }

    /// Filter, remap and run the heuristic in the configured space
    fn evaluate(
        &self,
        detections: Vec<Detection>,
        transform: &FrameTransform,
    ) -> (Vec<Detection>, Vec<AlertDecision>) {
        let config = self.heuristic.config();
        let survivors = filter_confident(detections, config.confidence_threshold);

        match config.evaluation_space {
            EvaluationSpace::Frame => {
                let mapped = remap_to_frame(survivors, transform);
                let decisions = mapped.iter().map(|d| self.heuristic.evaluate(d)).collect();
                (mapped, decisions)
            }
            EvaluationSpace::Detector => {
                let decisions = survivors.iter().map(|d| self.heuristic.evaluate(d)).collect();
                (remap_to_frame(survivors, transform), decisions)
            }
        }
    }
}
