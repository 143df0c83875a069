//! Keyed actor registry.
//!
//! One Tokio task per address, fed by a bounded mailbox. Because a single task
//! owns each actor's state, messages for one address are handled strictly one
//! at a time. Different addresses run independently.
//!
//! Actors may stop on their own (idle, or done for good). A stopping actor
//! closes its mailbox and drains what is already queued. When its task ends
//! the registry entry is removed, and the next message for that address
//! starts a fresh instance.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::actors::{ActorAddress, ActorError};

/// A stateful unit driven by its mailbox.
pub trait Actor: Send + Sized + 'static {
    type Message: Send + 'static;

    /// Processes messages until the mailbox closes or the actor decides to stop.
    fn run(self, mailbox: mpsc::Receiver<Self::Message>) -> impl Future<Output = ()> + Send;
}

type Factory<A> = Box<dyn Fn(&ActorAddress) -> A + Send + Sync>;

struct Mailbox<M> {
    generation: u64,
    sender: mpsc::Sender<M>,
}

/// Maps actor addresses to live mailboxes, spawning actors on first use.
pub struct ActorRegistry<A: Actor> {
    mailboxes: Arc<DashMap<String, Mailbox<A::Message>>>,
    factory: Factory<A>,
    mailbox_capacity: usize,
    generations: AtomicU64,
}

impl<A: Actor> ActorRegistry<A> {
    /// Creates an empty registry.
    ///
    /// `factory` builds the initial state of an actor each time its address is
    /// used while no instance is running.
    pub fn new(
        mailbox_capacity: usize,
        factory: impl Fn(&ActorAddress) -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            mailboxes: Arc::new(DashMap::new()),
            factory: Box::new(factory),
            mailbox_capacity: mailbox_capacity.max(1),
            generations: AtomicU64::new(0),
        }
    }

    /// Returns the mailbox for `address`, spawning the actor if needed.
    ///
    /// An actor whose mailbox has closed is replaced by a fresh instance.
    pub fn address(&self, address: &ActorAddress) -> mpsc::Sender<A::Message> {
        if let Some(sender) = self.live(address) {
            return sender;
        }

        let mut entry = self
            .mailboxes
            .entry(address.as_str().to_string())
            .or_insert_with(|| self.spawn(address));

        if entry.value().sender.is_closed() {
            *entry.value_mut() = self.spawn(address);
        }

        entry.value().sender.clone()
    }

    /// Returns the mailbox for `address` only if its actor is running.
    pub fn live(&self, address: &ActorAddress) -> Option<mpsc::Sender<A::Message>> {
        self.mailboxes
            .get(address.as_str())
            .filter(|mailbox| !mailbox.sender.is_closed())
            .map(|mailbox| mailbox.sender.clone())
    }

    /// Sends a request and waits for the actor's reply.
    ///
    /// If the actor stops between lookup and send, the message goes to a fresh
    /// instance instead.
    ///
    /// # Errors
    ///
    /// - [`ActorError::Unavailable`] if the message could not be delivered
    /// - [`ActorError::NoReply`] if the actor dropped the reply channel
    pub async fn ask<R: Send>(
        &self,
        address: &ActorAddress,
        make_message: impl FnOnce(oneshot::Sender<R>) -> A::Message,
    ) -> Result<R, ActorError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        if let Err(SendError(message)) = self.address(address).send(make_message(reply_tx)).await
        {
            self.address(address)
                .send(message)
                .await
                .map_err(|_| ActorError::Unavailable(address.to_string()))?;
        }

        reply_rx
            .await
            .map_err(|_| ActorError::NoReply(address.to_string()))
    }

    /// Like [`ask`](Self::ask), but never spawns. Returns `None` when no
    /// instance is running for `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::NoReply`] if the actor dropped the reply channel.
    pub async fn ask_live<R: Send>(
        &self,
        address: &ActorAddress,
        make_message: impl FnOnce(oneshot::Sender<R>) -> A::Message,
    ) -> Result<Option<R>, ActorError> {
        let Some(sender) = self.live(address) else {
            return Ok(None);
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if sender.send(make_message(reply_tx)).await.is_err() {
            return Ok(None);
        }

        reply_rx
            .await
            .map(Some)
            .map_err(|_| ActorError::NoReply(address.to_string()))
    }

    /// Number of addresses with a registered mailbox.
    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }

    fn spawn(&self, address: &ActorAddress) -> Mailbox<A::Message> {
        let (sender, receiver) = mpsc::channel(self.mailbox_capacity);
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let actor = (self.factory)(address);

        let mailboxes = Arc::clone(&self.mailboxes);
        let key = address.as_str().to_string();
        tokio::spawn(async move {
            actor.run(receiver).await;
            // A replacement may already be registered under the same key.
            mailboxes.remove_if(&key, |_, mailbox| mailbox.generation == generation);
            debug!("Actor {} stopped", key);
        });

        debug!("Spawned actor {}", address);
        Mailbox { generation, sender }
    }
}

/// Closes `mailbox` and hands every message still queued to `handle`.
///
/// Senders racing with the close get their message back and retry through
/// [`ActorRegistry::ask`].
pub async fn drain<M>(mailbox: &mut mpsc::Receiver<M>, mut handle: impl FnMut(M)) {
    mailbox.close();
    while let Some(message) = mailbox.recv().await {
        handle(message);
    }
}
