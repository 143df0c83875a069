//! Per-(link, destination) evaluation scheduler actor.
//!
//! The first click on a destination arms an alarm. When the alarm fires the
//! evaluation workflow is started, once. The actor then records its final
//! counts in a shared table of scheduled destinations and stops. Later clicks
//! for that destination are only counted there, without a task.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::registry::{Actor, ActorRegistry, drain};
use crate::domain::actors::{ActorAddress, ActorError, EvalScheduler};
use crate::domain::workflow::{EvaluationRequest, EvaluationWorkflow};

/// Lifecycle of one scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    /// No click seen yet.
    New,
    /// Clicks are being collected and the alarm is armed.
    Accumulating,
    /// The workflow has been started for this destination.
    Scheduled,
}

/// Point-in-time view of a scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalSnapshot {
    pub state: EvalState,
    pub total_clicks: u64,
    pub clicks_by_country: BTreeMap<String, u64>,
}

impl EvalSnapshot {
    fn new() -> Self {
        Self {
            state: EvalState::New,
            total_clicks: 0,
            clicks_by_country: BTreeMap::new(),
        }
    }

    fn count(&mut self, country: &str) {
        self.total_clicks += 1;
        *self
            .clicks_by_country
            .entry(country.to_string())
            .or_insert(0) += 1;
    }
}

/// Destinations whose workflow has started, keyed by actor address.
type ScheduledTable = Arc<DashMap<String, EvalSnapshot>>;

/// A click as reported to the scheduler.
#[derive(Debug, Clone)]
pub struct LinkClick {
    pub account_id: String,
    pub link_id: String,
    pub destination: String,
    pub country: String,
}

pub enum EvalSchedulerMessage {
    CollectLinkClick {
        click: LinkClick,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<EvalSnapshot>,
    },
}

pub struct EvalSchedulerActor {
    address: ActorAddress,
    workflow: Arc<dyn EvaluationWorkflow>,
    delay: Duration,
    scheduled: ScheduledTable,
    alarm: Option<Instant>,
    request: Option<EvaluationRequest>,
    tally: EvalSnapshot,
}

impl EvalSchedulerActor {
    pub fn new(
        address: ActorAddress,
        workflow: Arc<dyn EvaluationWorkflow>,
        delay: Duration,
        scheduled: ScheduledTable,
    ) -> Self {
        Self {
            address,
            workflow,
            delay,
            scheduled,
            alarm: None,
            request: None,
            tally: EvalSnapshot::new(),
        }
    }

    /// True once a previous instance for this address started the workflow.
    fn already_scheduled(&self) -> bool {
        self.scheduled.contains_key(self.address.as_str())
    }

    fn handle(&mut self, message: EvalSchedulerMessage) {
        match message {
            EvalSchedulerMessage::CollectLinkClick { click, reply } => {
                self.collect(click);
                let _ = reply.send(());
            }
            EvalSchedulerMessage::Snapshot { reply } => {
                let _ = reply.send(self.tally.clone());
            }
        }
    }

    fn collect(&mut self, click: LinkClick) {
        self.tally.count(&click.country);

        if self.tally.state == EvalState::New {
            self.request = Some(EvaluationRequest {
                account_id: click.account_id,
                link_id: click.link_id,
                destination: click.destination,
            });
            self.alarm = Some(Instant::now() + self.delay);
            self.tally.state = EvalState::Accumulating;
            info!(
                "Evaluation for {} armed, firing in {}s",
                self.address,
                self.delay.as_secs()
            );
        }
    }

    async fn fire(&mut self) {
        self.alarm = None;

        let Some(request) = self.request.clone() else {
            return;
        };

        match self.workflow.start(request).await {
            Ok(()) => {
                self.tally.state = EvalState::Scheduled;
                info!(
                    "Evaluation workflow started for {} after {} clicks",
                    self.address, self.tally.total_clicks
                );
            }
            Err(e) => {
                warn!("{} for {}, re-arming alarm", e, self.address);
                self.alarm = Some(Instant::now() + self.delay);
            }
        }
    }

    /// Publishes the final counts, then forwards whatever is still queued to
    /// the scheduled table.
    async fn retire(self, mut mailbox: mpsc::Receiver<EvalSchedulerMessage>) {
        let key = self.address.as_str().to_string();
        if self.tally.state == EvalState::Scheduled {
            self.scheduled.insert(key.clone(), self.tally);
        }

        let scheduled = self.scheduled;
        drain(&mut mailbox, |message| {
            let Some(mut entry) = scheduled.get_mut(&key) else {
                return;
            };
            match message {
                EvalSchedulerMessage::CollectLinkClick { click, reply } => {
                    entry.count(&click.country);
                    let _ = reply.send(());
                }
                EvalSchedulerMessage::Snapshot { reply } => {
                    let _ = reply.send(entry.clone());
                }
            }
        })
        .await;

        debug!("Evaluation scheduler {} stopped", key);
    }
}

impl Actor for EvalSchedulerActor {
    type Message = EvalSchedulerMessage;

    async fn run(mut self, mut mailbox: mpsc::Receiver<EvalSchedulerMessage>) {
        // An instance spawned after the workflow already started only hands its
        // messages over to the scheduled table.
        if self.already_scheduled() {
            self.retire(mailbox).await;
            return;
        }

        loop {
            let alarm = self.alarm;

            tokio::select! {
                message = mailbox.recv() => match message {
                    Some(message) => self.handle(message),
                    None => return,
                },
                _ = sleep_until(alarm.unwrap_or_else(Instant::now)), if alarm.is_some() => {
                    self.fire().await;
                    if self.tally.state == EvalState::Scheduled {
                        break;
                    }
                }
            }
        }

        self.retire(mailbox).await;
    }
}

/// [`EvalScheduler`] backed by in-process actors keyed by `link_id:destination`.
///
/// Only destinations waiting for their alarm hold a running actor.
pub struct ActorEvalScheduler {
    registry: ActorRegistry<EvalSchedulerActor>,
    scheduled: ScheduledTable,
}

impl ActorEvalScheduler {
    pub fn new(
        mailbox_capacity: usize,
        delay: Duration,
        workflow: Arc<dyn EvaluationWorkflow>,
    ) -> Self {
        let scheduled: ScheduledTable = Arc::new(DashMap::new());
        let table = Arc::clone(&scheduled);

        Self {
            registry: ActorRegistry::new(mailbox_capacity, move |address| {
                EvalSchedulerActor::new(
                    address.clone(),
                    workflow.clone(),
                    delay,
                    Arc::clone(&table),
                )
            }),
            scheduled,
        }
    }

    /// Returns the current state of the scheduler for a link destination.
    ///
    /// A destination that has never been clicked reports [`EvalState::New`].
    pub async fn snapshot(
        &self,
        link_id: &str,
        destination: &str,
    ) -> Result<EvalSnapshot, ActorError> {
        let address = ActorAddress::for_link_destination(link_id, destination);

        if let Some(done) = self.scheduled.get(address.as_str()) {
            return Ok(done.clone());
        }

        let live = self
            .registry
            .ask_live(&address, |reply| EvalSchedulerMessage::Snapshot { reply })
            .await?;

        Ok(live
            .or_else(|| self.scheduled.get(address.as_str()).map(|done| done.clone()))
            .unwrap_or_else(EvalSnapshot::new))
    }

    /// Number of destinations with a running scheduler actor.
    pub fn live_actors(&self) -> usize {
        self.registry.len()
    }
}

#[async_trait]
impl EvalScheduler for ActorEvalScheduler {
    async fn collect_link_click(
        &self,
        account_id: &str,
        link_id: &str,
        destination: &str,
        country: &str,
    ) -> Result<(), ActorError> {
        let address = ActorAddress::for_link_destination(link_id, destination);

        if let Some(mut done) = self.scheduled.get_mut(address.as_str()) {
            done.count(country);
            return Ok(());
        }

        let click = LinkClick {
            account_id: account_id.to_string(),
            link_id: link_id.to_string(),
            destination: destination.to_string(),
            country: country.to_string(),
        };

        self.registry
            .ask(&address, |reply| EvalSchedulerMessage::CollectLinkClick {
                click,
                reply,
            })
            .await
    }
}
