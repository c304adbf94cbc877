//! Actuator interfaces and logging implementations

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::AlertError;

/// How a new utterance interacts with queued speech
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Drop anything queued or playing and speak now
    Flush,
    /// Speak after whatever is queued
    Add,
}

/// Vibration motor
pub trait HapticActuator: Send {
    fn pulse(&mut self, duration: Duration) -> Result<(), AlertError>;
}

/// Speech synthesizer.
///
/// Implementations own their engine lifecycle: `speak` brings the engine
/// up if needed, `cancel` stops playback and releases it. `cancel` on an
/// engine that was never started must be a no-op.
pub trait SpeechActuator: Send {
    fn speak(&mut self, text: &str, mode: QueueMode) -> Result<(), AlertError>;

    fn cancel(&mut self);
}

/// Haptic actuator that logs pulses instead of driving a motor
#[derive(Debug, Default)]
pub struct LoggingHaptic {
    pulses: u64,
}

impl LoggingHaptic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> u64 {
        self.pulses
    }
}

impl HapticActuator for LoggingHaptic {
    fn pulse(&mut self, duration: Duration) -> Result<(), AlertError> {
        if duration.is_zero() {
            return Err(AlertError::Haptic("zero-length pulse".into()));
        }
        self.pulses += 1;
        info!("Vibrate {}ms", duration.as_millis());
        Ok(())
    }
}

#[derive(Debug)]
struct SpeechEngine {
    language: String,
    queue: VecDeque<String>,
}

/// Speech actuator that logs utterances.
///
/// Keeps a real engine lifecycle so callers see the same start/stop
/// behaviour as a platform synthesizer.
#[derive(Debug)]
pub struct LoggingSpeech {
    language: String,
    engine: Option<SpeechEngine>,
    engines_started: u64,
}

impl LoggingSpeech {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            engine: None,
            engines_started: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    /// Utterances waiting in the engine queue
    pub fn queued(&self) -> Vec<String> {
        self.engine
            .as_ref()
            .map(|e| e.queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn engines_started(&self) -> u64 {
        self.engines_started
    }

    fn start_engine(&mut self) -> Result<SpeechEngine, AlertError> {
        if self.language.trim().is_empty() {
            return Err(AlertError::SpeechInit("no language configured".into()));
        }
        self.engines_started += 1;
        info!("Speech engine initialized ({})", self.language);
        Ok(SpeechEngine {
            language: self.language.clone(),
            queue: VecDeque::new(),
        })
    }
}

impl SpeechActuator for LoggingSpeech {
    fn speak(&mut self, text: &str, mode: QueueMode) -> Result<(), AlertError> {
        if text.trim().is_empty() {
            return Err(AlertError::Speech("empty utterance".into()));
        }
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => self.start_engine()?,
        };
        let engine = self.engine.insert(engine);

        if mode == QueueMode::Flush && !engine.queue.is_empty() {
            debug!("Flushing {} queued utterances", engine.queue.len());
            engine.queue.clear();
        }
        engine.queue.push_back(text.to_string());
        warn!("[{}] {}", engine.language, text);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(engine) = self.engine.take() {
            info!(
                "Speech stopped, engine released ({} utterances dropped)",
                engine.queue.len()
            );
        }
    }
}
