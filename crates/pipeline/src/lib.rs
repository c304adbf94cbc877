//! Proximity Alert Pipeline
//!
//! Wires the road camera, the object detector and the alert actuators:
//! - single-flight frame admission on the capture context
//! - detection, filter/remap and proximity evaluation on a worker thread
//! - alert dispatch and tracker hand-off per processed frame
//! - fire-and-forget UI updates

use adas::TransformError;
use camera_capture::CameraError;
use inference_engine::InferenceError;
use thiserror::Error;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod buffer;
pub mod config;
pub mod gate;
pub mod pipeline;
pub mod single_flight;
pub mod state;
pub mod tracker;
pub mod ui;
mod worker;

pub use buffer::BufferPool;
pub use config::PipelineConfig;
pub use gate::{Admission, FrameAdmissionGate};
pub use pipeline::Pipeline;
pub use single_flight::{FlightGuard, SingleFlight};
pub use state::PipelineState;
pub use tracker::{LoggingTracker, Tracker};
pub use ui::{UiEvent, UiReceiver};

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detection worker has terminated")]
    WorkerTerminated,

    #[error("Failed to spawn detection worker: {0}")]
    Spawn(String),

    #[error("Detection worker panicked")]
    WorkerPanicked,
}

/// Initialize logging at `level` ("error" .. "trace"), INFO if unparseable
pub fn init_logging(level: &str) {
    let max_level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Tracing subscriber already set");
    }
}
