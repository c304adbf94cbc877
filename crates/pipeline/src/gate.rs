//! Frame admission gate
//!
//! Runs on the capture context. Every frame is either handed to the
//! detection worker or dropped on the spot:
//! - at most one frame is in flight
//! - the camera buffer is released before `admit` returns
//! - every arriving frame consumes a sequence number

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use adas::FrameTransform;
use camera_capture::{CaptureBuffer, VideoFrame};
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::buffer::BufferPool;
use crate::state::PipelineState;
use crate::ui::{UiEvent, UiSender};
use crate::worker::{WorkItem, WorkerCommand};
use crate::PipelineError;

/// What happened to an arriving frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Copied and queued for detection
    Accepted { sequence: u64 },
    /// A detection was already in flight
    Dropped { sequence: u64 },
}

impl Admission {
    pub fn sequence(&self) -> u64 {
        match *self {
            Admission::Accepted { sequence } | Admission::Dropped { sequence } => sequence,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }
}

/// Decides per frame whether a detection starts
pub struct FrameAdmissionGate {
    state: Arc<PipelineState>,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    ui: UiSender,
    pool: BufferPool,
    detector_input_size: u32,
    maintain_aspect: bool,
    rotation: i32,
    next_sequence: u64,
}

impl FrameAdmissionGate {
    pub(crate) fn new(
        state: Arc<PipelineState>,
        commands: mpsc::UnboundedSender<WorkerCommand>,
        ui: UiSender,
        pool: BufferPool,
        detector_input_size: u32,
        maintain_aspect: bool,
        rotation: i32,
    ) -> Self {
        Self {
            state,
            commands,
            ui,
            pool,
            detector_input_size,
            maintain_aspect,
            rotation,
            next_sequence: 0,
        }
    }

    /// Handle one camera callback.
    ///
    /// The buffer is always released before this returns, whether the
    /// frame was accepted or dropped.
    pub fn admit(&mut self, buffer: CaptureBuffer<'_>) -> Result<Admission, PipelineError> {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.ui.post(UiEvent::InvalidateOverlay);

        let Some(guard) = self.state.flight().try_acquire() else {
            buffer.release();
            counter!("frames_dropped_total").increment(1);
            debug!("Frame {} dropped: detection in flight", sequence);
            return Ok(Admission::Dropped { sequence });
        };

        let (width, height) = (buffer.width(), buffer.height());
        if self.state.transform().source_size() != (width, height) {
            warn!("Preview size changed to {}x{}, rebuilding transform", width, height);
            self.reconfigure(width, height, self.rotation)?;
        }

        let mut pixels = self.pool.take(width as usize * height as usize * 3);
        buffer.copy_rgb_into(&mut pixels);
        buffer.release();

        let item = WorkItem {
            frame: VideoFrame::new(pixels, width, height, timestamp_ns(), sequence),
            transform: self.state.transform(),
            guard,
        };
        if self.commands.send(WorkerCommand::Detect(item)).is_err() {
            // The returned item carries the guard; dropping it frees the flight.
            return Err(PipelineError::WorkerTerminated);
        }

        counter!("frames_admitted_total").increment(1);
        debug!("Frame {} admitted", sequence);
        Ok(Admission::Accepted { sequence })
    }

    /// Rebuild the crop transform for a new preview size or orientation
    pub fn reconfigure(
        &mut self,
        width: u32,
        height: u32,
        rotation: i32,
    ) -> Result<(), PipelineError> {
        let transform = FrameTransform::for_detector(
            width,
            height,
            self.detector_input_size,
            rotation,
            self.maintain_aspect,
        )?;
        self.state.set_transform(transform);
        self.rotation = rotation;
        info!(
            "Transform rebuilt: {}x{} -> {}x{}, rotation {}",
            width, height, self.detector_input_size, self.detector_input_size, rotation
        );
        Ok(())
    }

    /// Forward the hardware-acceleration toggle to the worker
    pub fn set_use_nnapi(&self, enabled: bool) -> Result<(), PipelineError> {
        self.send(WorkerCommand::UseNnapi(enabled))
    }

    pub fn set_num_threads(&self, num_threads: usize) -> Result<(), PipelineError> {
        self.send(WorkerCommand::NumThreads(num_threads))
    }

    pub(crate) fn send(&self, command: WorkerCommand) -> Result<(), PipelineError> {
        self.commands
            .send(command)
            .map_err(|_| PipelineError::WorkerTerminated)
    }
}

fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
