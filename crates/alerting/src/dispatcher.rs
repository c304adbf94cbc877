//! Alert dispatcher

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::actuator::{HapticActuator, LoggingHaptic, LoggingSpeech, QueueMode, SpeechActuator};
use crate::config::AlertConfig;
use crate::cooldown::AlertCooldown;

/// What `fire` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired,
    Suppressed,
}

/// Drives the vibration motor and speech synthesizer for proximity alerts.
///
/// Each effect is best-effort and independent: a failing motor does not
/// stop the utterance and vice versa.
pub struct AlertDispatcher {
    config: AlertConfig,
    haptic: Box<dyn HapticActuator>,
    speech: Box<dyn SpeechActuator>,
    cooldown: Option<AlertCooldown>,
    fired: u64,
}

impl AlertDispatcher {
    pub fn new(
        config: AlertConfig,
        haptic: Box<dyn HapticActuator>,
        speech: Box<dyn SpeechActuator>,
    ) -> Self {
        let cooldown = config
            .cooldown_ms
            .map(|ms| AlertCooldown::new(Duration::from_millis(ms)));
        if let Some(ms) = config.cooldown_ms {
            info!("Alert cooldown enabled: {}ms per label", ms);
        }
        Self {
            config,
            haptic,
            speech,
            cooldown,
            fired: 0,
        }
    }

    /// Dispatcher with logging actuators
    pub fn logging(config: AlertConfig) -> Self {
        let speech = LoggingSpeech::new(config.language.clone());
        Self::new(config, Box::new(LoggingHaptic::new()), Box::new(speech))
    }

    /// Alert for one qualifying detection
    pub fn fire(&mut self, label: &str) -> FireOutcome {
        let now = Instant::now();
        if let Some(cooldown) = &self.cooldown {
            if !cooldown.should_fire(label, now) {
                return FireOutcome::Suppressed;
            }
        }

        info!("{} is too close", label);

        let pulse = Duration::from_millis(self.config.haptic_pulse_ms);
        if let Err(e) = self.haptic.pulse(pulse) {
            warn!("Haptic alert failed: {}", e);
        }
        if let Err(e) = self.speech.speak(&self.config.utterance, QueueMode::Flush) {
            warn!("Speech alert failed: {}", e);
        }

        if let Some(cooldown) = &mut self.cooldown {
            cooldown.record_fire(label, now);
        }
        self.fired += 1;
        FireOutcome::Fired
    }

    /// Stop any utterance and release the speech engine
    pub fn cancel(&mut self) {
        self.speech.cancel();
    }

    /// Alerts fired so far
    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn into_handle(self) -> AlertHandle {
        AlertHandle {
            inner: Arc::new(Mutex::new(self)),
        }
    }
}

/// Shared handle used by the worker to fire and by the UI to stop
#[derive(Clone)]
pub struct AlertHandle {
    inner: Arc<Mutex<AlertDispatcher>>,
}

impl AlertHandle {
    fn lock(&self) -> MutexGuard<'_, AlertDispatcher> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fire(&self, label: &str) -> FireOutcome {
        self.lock().fire(label)
    }

    pub fn cancel(&self) {
        self.lock().cancel();
    }

    pub fn fired(&self) -> u64 {
        self.lock().fired()
    }
}

impl From<AlertDispatcher> for AlertHandle {
    fn from(dispatcher: AlertDispatcher) -> Self {
        dispatcher.into_handle()
    }
}
