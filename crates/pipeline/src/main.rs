//! Proximity Alert - Main Entry Point
//!
//! Usage: `proximity-alert [CONFIG]`, or set `PROXIMITY_CONFIG`.

use std::path::PathBuf;
use std::time::Duration;

use alerting::AlertDispatcher;
use anyhow::Context;
use camera_capture::{CaptureSource, SyntheticCamera};
use inference_engine::create_detector;
use pipeline::{init_logging, LoggingTracker, Pipeline, PipelineConfig, PipelineError, UiEvent};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PROXIMITY_CONFIG").ok())
        .map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref()).context("loading configuration")?;

    init_logging(&config.log_level);
    info!("=== Proximity Alert v{} ===", env!("CARGO_PKG_VERSION"));

    let detector = match create_detector(&config.detector) {
        Ok(detector) => detector,
        Err(e) => {
            error!("Detector could not be initialized: {}", e);
            return Err(e).context("initializing detector");
        }
    };

    let alerts = AlertDispatcher::logging(config.alert.clone());
    let (mut pipeline, mut ui) =
        Pipeline::start(&config, detector, Box::new(LoggingTracker::new()), alerts)?;
    let stop = pipeline.alerts();

    let mut camera = SyntheticCamera::new(config.camera.clone())?;
    let period = Duration::from_secs_f64(1.0 / f64::from(camera.config().fps.max(1)));
    let mut ticker = tokio::time::interval(period);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut delivered = 0u64;
    let mut accepted = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let buffer = camera.capture()?;
                match pipeline.admit(buffer) {
                    Ok(admission) => {
                        let verdict = if admission.is_accepted() {
                            accepted += 1;
                            "admitted"
                        } else {
                            "dropped"
                        };
                        debug!("Frame {} {}", admission.sequence(), verdict);
                    }
                    Err(PipelineError::WorkerTerminated) => {
                        error!("Detection worker terminated, shutting down");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
                delivered += 1;
                if config.max_frames.is_some_and(|max| delivered >= max) {
                    info!("Processed frame budget of {} reached", delivered);
                    break;
                }
            }
            Some(event) = ui.recv() => match event {
                UiEvent::InferenceTime(elapsed) => info!("Inference time: {}", elapsed),
                UiEvent::InvalidateOverlay => {}
            },
            _ = &mut ctrl_c => {
                info!("Stop requested");
                stop.cancel();
                break;
            }
        }
    }

    info!(
        "{} frames delivered, {} admitted, {} alerts fired, last inference {:?}",
        camera.frames_delivered(),
        accepted,
        stop.fired(),
        pipeline.last_processing_time()
    );
    pipeline.shutdown()?;
    Ok(())
}
