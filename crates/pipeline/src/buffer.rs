//! Working buffer recycling

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Pool of pixel buffers passed between the gate and the worker.
///
/// With a single frame in flight the pool settles at one buffer, so
/// steady-state admission does not allocate.
#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    spare: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cleared buffer with room for `capacity` bytes
    pub fn take(&self, capacity: usize) -> Vec<u8> {
        let recycled = self
            .spare
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match recycled {
            Some(mut buffer) => {
                buffer.clear();
                buffer.reserve(capacity);
                buffer
            }
            None => {
                debug!("Allocating working buffer of {} bytes", capacity);
                Vec::with_capacity(capacity)
            }
        }
    }

    /// Hand a buffer back for reuse
    pub fn give_back(&self, buffer: Vec<u8>) {
        self.spare
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buffer);
    }

    pub fn spare_count(&self) -> usize {
        self.spare.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
