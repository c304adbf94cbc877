//! Alerting System
//!
//! Drives the haptic and speech actuators when a proximity alert fires,
//! with an optional per-label cooldown.

mod actuator;
mod config;
mod cooldown;
mod dispatcher;

pub use actuator::{HapticActuator, LoggingHaptic, LoggingSpeech, QueueMode, SpeechActuator};
pub use config::AlertConfig;
pub use cooldown::AlertCooldown;
pub use dispatcher::{AlertDispatcher, AlertHandle, FireOutcome};

use thiserror::Error;

/// Actuator failures
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Vibration actuator unavailable: {0}")]
    Haptic(String),
    #[error("Speech engine failed to initialize: {0}")]
    SpeechInit(String),
    #[error("Speech synthesis failed: {0}")]
    Speech(String),
}
