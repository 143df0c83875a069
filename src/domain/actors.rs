//! Contracts for the keyed stateful actors that consume clicks.
//!
//! Each actor instance is addressed by a stable key. The same key always
//! reaches the same instance, which serializes its own state changes. Nothing
//! here assumes atomicity across two instances.
//!
//! # Implementations
//!
//! - [`crate::infrastructure::actors::ActorClickTracker`]
//! - [`crate::infrastructure::actors::ActorEvalScheduler`]

use crate::domain::click_event::GeoClick;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Deterministic identity of an actor instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorAddress(String);

impl ActorAddress {
    /// Address of the click tracker owned by an account.
    pub fn for_account(account_id: &str) -> Self {
        Self(account_id.to_string())
    }

    /// Address of the evaluation scheduler for one link destination.
    pub fn for_link_destination(link_id: &str, destination: &str) -> Self {
        Self(format!("{}:{}", link_id, destination))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while talking to an actor instance.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("actor {0} is unavailable")]
    Unavailable(String),
    #[error("actor {0} dropped the request without replying")]
    NoReply(String),
}

/// Per-account click tracker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickTracker: Send + Sync {
    /// Appends a geotagged click to the tracker owned by `account_id`.
    async fn add_click(&self, account_id: &str, click: GeoClick) -> Result<(), ActorError>;
}

/// Per-(link, destination) evaluation scheduler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvalScheduler: Send + Sync {
    /// Notifies the scheduler for `link_id:destination` of a click.
    ///
    /// The instance aggregates repeated notifications, so calling this more
    /// than once for the same click is harmless.
    async fn collect_link_click(
        &self,
        account_id: &str,
        link_id: &str,
        destination: &str,
        country: &str,
    ) -> Result<(), ActorError>;
}
