//! Events posted from the worker to the capture/UI context

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// UI update requests. Posting never blocks the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Redraw the tracking overlay
    InvalidateOverlay,
    /// Show the last inference duration, e.g. "112ms"
    InferenceTime(String),
}

/// Posting side of the UI channel.
///
/// At most one `InvalidateOverlay` is queued at a time; further
/// requests are folded into it until the receiver takes it.
#[derive(Debug, Clone)]
pub(crate) struct UiSender {
    tx: mpsc::UnboundedSender<UiEvent>,
    overlay_pending: Arc<AtomicBool>,
}

/// Receiving side of the UI channel
#[derive(Debug)]
pub struct UiReceiver {
    rx: mpsc::UnboundedReceiver<UiEvent>,
    overlay_pending: Arc<AtomicBool>,
}

pub(crate) fn channel() -> (UiSender, UiReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let overlay_pending = Arc::new(AtomicBool::new(false));
    (
        UiSender {
            tx,
            overlay_pending: Arc::clone(&overlay_pending),
        },
        UiReceiver {
            rx,
            overlay_pending,
        },
    )
}

impl UiSender {
    /// Post without waiting; a closed UI is not the worker's problem
    pub(crate) fn post(&self, event: UiEvent) {
        if event == UiEvent::InvalidateOverlay && self.overlay_pending.swap(true, Ordering::AcqRel)
        {
            return;
        }
        let _ = self.tx.send(event);
    }
}

impl UiReceiver {
    pub async fn recv(&mut self) -> Option<UiEvent> {
        let event = self.rx.recv().await;
        self.taken(event)
    }

    /// Blocking variant for callers outside the async runtime
    pub fn blocking_recv(&mut self) -> Option<UiEvent> {
        let event = self.rx.blocking_recv();
        self.taken(event)
    }

    fn taken(&self, event: Option<UiEvent>) -> Option<UiEvent> {
        if event == Some(UiEvent::InvalidateOverlay) {
            self.overlay_pending.store(false, Ordering::Release);
        }
        event
    }
}
