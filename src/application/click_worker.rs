//! Background consumer of the click queue.
//!
//! Every dequeued [`ClickEvent`] is forwarded to the evaluation scheduler of its
//! link destination. Failed calls are retried with exponential backoff; once the
//! retries run out the event is dropped and counted.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{Semaphore, mpsc};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info};

use crate::application::services::EvaluationService;
use crate::domain::actors::EvalScheduler;
use crate::domain::click_event::ClickEvent;

/// Attempts per event before it is dropped.
pub const MAX_ATTEMPTS: usize = 3;

fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(50)
        .max_delay(Duration::from_secs(2))
        .map(jitter)
        .take(MAX_ATTEMPTS - 1)
}

/// Consumes `rx` until every sender is dropped, processing at most
/// `concurrency` events at a time.
///
/// Returns after the channel is closed and all in-flight events are done.
pub async fn run_click_worker<S>(
    mut rx: mpsc::Receiver<ClickEvent>,
    evaluation: Arc<EvaluationService<S>>,
    concurrency: usize,
) where
    S: EvalScheduler + ?Sized + 'static,
{
    let concurrency = concurrency.max(1);
    let permits = Arc::new(Semaphore::new(concurrency));

    info!("Click worker started (concurrency: {})", concurrency);

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let evaluation = evaluation.clone();
        tokio::spawn(async move {
            process_event(&evaluation, event).await;
            drop(permit);
        });
    }

    // Wait for in-flight events before reporting shutdown.
    let _ = permits.acquire_many(concurrency as u32).await;

    info!("Click worker stopped");
}

async fn process_event<S>(evaluation: &EvaluationService<S>, event: ClickEvent)
where
    S: EvalScheduler + ?Sized,
{
    let result = Retry::start(retry_strategy(), || evaluation.schedule_evaluation(&event)).await;

    match result {
        Ok(()) => {
            debug!(
                "Evaluation notified for {} -> {}",
                event.link_id, event.destination
            );
            counter!("click_events_processed_total").increment(1);
        }
        Err(e) => {
            error!(
                "Dropping click on {} after {} attempts: {}",
                event.link_id, MAX_ATTEMPTS, e
            );
            counter!("click_events_dropped_total").increment(1);
        }
    }
}
