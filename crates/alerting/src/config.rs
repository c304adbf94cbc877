//! Alert configuration

use serde::{Deserialize, Serialize};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Vibration pulse length (milliseconds)
    pub haptic_pulse_ms: u64,
    /// Utterance spoken on every alert
    pub utterance: String,
    /// Speech language tag
    pub language: String,
    /// Suppress repeat alerts for the same label within this window.
    /// `None` fires on every qualifying detection.
    pub cooldown_ms: Option<u64>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            haptic_pulse_ms: 100,
            utterance: "Warning".to_string(),
            language: "en".to_string(),
            cooldown_ms: None,
        }
    }
}
