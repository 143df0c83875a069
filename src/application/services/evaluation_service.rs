//! Evaluation scheduling for dequeued clicks.

use std::sync::Arc;

use crate::domain::actors::{ActorError, EvalScheduler};
use crate::domain::click_event::ClickEvent;

/// Forwards clicks to the evaluation scheduler of their link destination.
///
/// Called by the queue consumer, never by the redirect path. The scheduler
/// for `link_id:destination` aggregates repeated notifications, so
/// redelivered events are safe.
pub struct EvaluationService<S: EvalScheduler + ?Sized> {
    scheduler: Arc<S>,
}

impl<S: EvalScheduler + ?Sized> EvaluationService<S> {
    /// Creates a new evaluation service.
    pub fn new(scheduler: Arc<S>) -> Self {
        Self { scheduler }
    }

    /// Reports `event` to its evaluation scheduler.
    ///
    /// A missing country is reported as [`crate::domain::click_event::UNKNOWN_COUNTRY`].
    ///
    /// # Errors
    ///
    /// Returns [`ActorError`] if the scheduler cannot be reached.
    pub async fn schedule_evaluation(&self, event: &ClickEvent) -> Result<(), ActorError> {
        self.scheduler
            .collect_link_click(
                &event.account_id,
                &event.link_id,
                &event.destination,
                event.country_or_unknown(),
            )
            .await
    }
}
