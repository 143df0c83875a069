//! Click queue contract.

use crate::domain::click_event::ClickEvent;
use async_trait::async_trait;
use thiserror::Error;

/// Failures of a single fan-out step.
///
/// Logged by the dispatcher and never surfaced to the redirect caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("click queue is full")]
    QueueFull,
    #[error("click queue is closed")]
    QueueClosed,
}

/// At-least-once queue feeding downstream click processing.
///
/// No ordering is assumed and consumers must tolerate duplicates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickQueue: Send + Sync {
    async fn send(&self, event: ClickEvent) -> Result<(), DispatchError>;
}
