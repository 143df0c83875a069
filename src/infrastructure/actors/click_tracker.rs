//! Per-account click tracker actor.
//!
//! History lives only as long as the actor. An account that sees no click for
//! the idle timeout has its actor stopped and its history dropped.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace};

use super::registry::{Actor, ActorRegistry, drain};
use crate::domain::actors::{ActorAddress, ActorError, ClickTracker};
use crate::domain::click_event::GeoClick;

pub enum ClickTrackerMessage {
    AddClick {
        click: GeoClick,
        reply: oneshot::Sender<()>,
    },
    RecentClicks {
        reply: oneshot::Sender<Vec<GeoClick>>,
    },
}

/// Keeps the most recent geotagged clicks of one account, oldest first.
pub struct ClickTrackerActor {
    account_id: String,
    clicks: VecDeque<GeoClick>,
    history_limit: usize,
    idle_timeout: Duration,
}

impl ClickTrackerActor {
    pub fn new(account_id: &str, history_limit: usize, idle_timeout: Duration) -> Self {
        Self {
            account_id: account_id.to_string(),
            clicks: VecDeque::new(),
            history_limit: history_limit.max(1),
            idle_timeout,
        }
    }

    fn handle(&mut self, message: ClickTrackerMessage) {
        match message {
            ClickTrackerMessage::AddClick { click, reply } => {
                self.add_click(click);
                let _ = reply.send(());
            }
            ClickTrackerMessage::RecentClicks { reply } => {
                let _ = reply.send(self.clicks.iter().cloned().collect());
            }
        }
    }

    fn add_click(&mut self, click: GeoClick) {
        trace!(
            account_id = %self.account_id,
            country = %click.country,
            "Recording click"
        );

        if self.clicks.len() == self.history_limit {
            self.clicks.pop_front();
        }
        self.clicks.push_back(click);
    }
}

impl Actor for ClickTrackerActor {
    type Message = ClickTrackerMessage;

    async fn run(mut self, mut mailbox: mpsc::Receiver<ClickTrackerMessage>) {
        loop {
            match timeout(self.idle_timeout, mailbox.recv()).await {
                Ok(Some(message)) => self.handle(message),
                Ok(None) => return,
                Err(_) => break,
            }
        }

        debug!(
            account_id = %self.account_id,
            clicks = self.clicks.len(),
            "Click tracker idle, stopping"
        );
        drain(&mut mailbox, |message| self.handle(message)).await;
    }
}

/// [`ClickTracker`] backed by in-process actors keyed by account id.
pub struct ActorClickTracker {
    registry: ActorRegistry<ClickTrackerActor>,
}

impl ActorClickTracker {
    pub fn new(mailbox_capacity: usize, history_limit: usize, idle_timeout: Duration) -> Self {
        Self {
            registry: ActorRegistry::new(mailbox_capacity, move |address| {
                ClickTrackerActor::new(address.as_str(), history_limit, idle_timeout)
            }),
        }
    }

    /// Returns the clicks currently held for an account, oldest first.
    ///
    /// An account without a running tracker has no history.
    pub async fn recent_clicks(&self, account_id: &str) -> Result<Vec<GeoClick>, ActorError> {
        let clicks = self
            .registry
            .ask_live(&ActorAddress::for_account(account_id), |reply| {
                ClickTrackerMessage::RecentClicks { reply }
            })
            .await?;

        Ok(clicks.unwrap_or_default())
    }

    /// Number of accounts with a running tracker.
    pub fn live_actors(&self) -> usize {
        self.registry.len()
    }
}

#[async_trait]
impl ClickTracker for ActorClickTracker {
    async fn add_click(&self, account_id: &str, click: GeoClick) -> Result<(), ActorError> {
        self.registry
            .ask(&ActorAddress::for_account(account_id), |reply| {
                ClickTrackerMessage::AddClick { click, reply }
            })
            .await
    }
}
