//! In-process click queue backed by a bounded Tokio channel.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::click_event::ClickEvent;
use crate::domain::queue::{ClickQueue, DispatchError};

/// Click queue feeding [`crate::application::click_worker::run_click_worker`].
///
/// Sends never wait: a full channel drops the click rather than holding up the
/// dispatch task.
pub struct ChannelQueue {
    sender: mpsc::Sender<ClickEvent>,
}

impl ChannelQueue {
    pub fn new(sender: mpsc::Sender<ClickEvent>) -> Self {
        Self { sender }
    }

    /// Returns true once the consumer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Free slots currently available in the channel.
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}

#[async_trait]
impl ClickQueue for ChannelQueue {
    async fn send(&self, event: ClickEvent) -> Result<(), DispatchError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::QueueClosed,
        })
    }
}
