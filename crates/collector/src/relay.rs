// ABOUTME: The Relay trait: the seam between the page-side collector and the privileged boundary.
// ABOUTME: Includes a recording relay used by tests and dry runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::PageRelayError;
use crate::message::{Ack, Message};

/// Delivers messages from the page side to the privileged boundary.
///
/// Sends are at-most-once: callers never retry a failed send.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn send(&self, message: Message) -> Result<Ack, PageRelayError>;
}

/// A relay that keeps every message it is given and acknowledges it.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    sent: Mutex<Vec<Message>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first.
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Relay for RecordingRelay {
    async fn send(&self, message: Message) -> Result<Ack, PageRelayError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
        Ok(Ack::ok())
    }
}
