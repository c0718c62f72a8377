//! Voice session gate.
//!
//! Transcription and synthesis share one constrained model resource, so only
//! one voice session may run at a time. The permit is released when dropped,
//! whatever path the session leaves by.

use heyrag_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Concurrent voice sessions allowed by default.
pub const DEFAULT_VOICE_CAPACITY: usize = 1;

/// Shared admission gate for voice sessions.
#[derive(Debug, Clone)]
pub struct VoiceGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Right to use the voice resource for one round-trip.
#[derive(Debug)]
pub struct VoicePermit {
    _permit: OwnedSemaphorePermit,
}

impl Drop for VoicePermit {
    fn drop(&mut self) {
        tracing::debug!("Voice gate released");
    }
}

impl VoiceGate {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_VOICE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait until the resource is free.
    pub async fn acquire(&self) -> AppResult<VoicePermit> {
        tracing::debug!(available = self.available(), "Waiting for voice gate");

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AppError::Other("voice gate closed".to_string()))?;

        tracing::debug!("Voice gate acquired");
        Ok(VoicePermit { _permit: permit })
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for VoiceGate {
    fn default() -> Self {
        Self::new()
    }
}
