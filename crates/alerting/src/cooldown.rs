//! Per-label alert cooldown

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

/// Last fire time and count for one label
#[derive(Debug, Clone)]
struct LabelState {
    last_fired: Instant,
    fire_count: usize,
}

/// Suppresses repeat alerts for the same label inside a time window
#[derive(Debug)]
pub struct AlertCooldown {
    window: Duration,
    states: HashMap<String, LabelState>,
}

impl AlertCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            states: HashMap::new(),
        }
    }

    /// Check if `label` may fire at `now`
    pub fn should_fire(&self, label: &str, now: Instant) -> bool {
        match self.states.get(label) {
            Some(state) if now.saturating_duration_since(state.last_fired) < self.window => {
                debug!("Alert for {} suppressed: in cooldown period", label);
                false
            }
            _ => true,
        }
    }

    /// Record that an alert for `label` fired at `now`
    pub fn record_fire(&mut self, label: &str, now: Instant) {
        let state = self.states.entry(label.to_string()).or_insert(LabelState {
            last_fired: now,
            fire_count: 0,
        });
        state.last_fired = now;
        state.fire_count += 1;
    }

    pub fn fire_count(&self, label: &str) -> usize {
        self.states.get(label).map(|s| s.fire_count).unwrap_or(0)
    }
}
