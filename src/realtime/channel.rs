//! SSE Channel
//!
//! [`Channel`] implementation backed by a bounded queue drained by the
//! response body stream. A full queue counts as a failed write, so a client
//! that stops reading is dropped instead of stalling the hub.

use axum::body::Bytes;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::hub::{Channel, ChannelError};

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closing,
    Closed,
}

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Server-side end of one SSE connection
pub struct SseChannel {
    id: String,
    state: AtomicU8,
    sender: Mutex<Option<mpsc::Sender<Bytes>>>,
}

impl SseChannel {
    /// Create a channel and the receiver its response body drains.
    ///
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let channel = Self {
            id: Uuid::new_v4().to_string(),
            state: AtomicU8::new(OPEN),
            sender: Mutex::new(Some(tx)),
        };
        (channel, rx)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChannelState {
        match self.state.load(Ordering::Acquire) {
            OPEN => ChannelState::Open,
            CLOSING => ChannelState::Closing,
            _ => ChannelState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }
}

impl Channel for SseChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn write(&self, frame: &str) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }

        let sender = self.sender.lock().unwrap_or_else(|p| p.into_inner());
        let Some(tx) = sender.as_ref() else {
            return Err(ChannelError::Closed);
        };

        match tx.try_send(Bytes::from(frame.to_owned())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ChannelError::Full),
            Err(TrySendError::Closed(_)) => Err(ChannelError::Closed),
        }
    }

    fn close(&self) {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        // Dropping the sender ends the body stream once queued frames drain
        self.sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        self.state.store(CLOSED, Ordering::Release);

        tracing::debug!(channel_id = %self.id, "Alert channel closed");
    }
}
