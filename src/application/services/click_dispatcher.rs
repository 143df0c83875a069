//! Click fan-out to the queue and the per-account click tracker.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::actors::ClickTracker;
use crate::domain::click_event::ClickEvent;
use crate::domain::queue::ClickQueue;

/// Default upper bound on concurrently running dispatches.
pub const DEFAULT_MAX_IN_FLIGHT: u32 = 1024;

/// Delivers each click to its independent sinks.
///
/// The queue send and the click tracker call run concurrently. Either may fail
/// without affecting the other; failures are logged and counted, never retried
/// here and never returned to the caller.
pub struct ClickDispatcher<Q: ClickQueue + ?Sized, T: ClickTracker + ?Sized> {
    queue: Arc<Q>,
    tracker: Arc<T>,
    in_flight: Arc<Semaphore>,
    max_in_flight: u32,
}

impl<Q, T> ClickDispatcher<Q, T>
where
    Q: ClickQueue + ?Sized + 'static,
    T: ClickTracker + ?Sized + 'static,
{
    /// Creates a dispatcher allowing up to `max_in_flight` background dispatches.
    pub fn new(queue: Arc<Q>, tracker: Arc<T>, max_in_flight: u32) -> Self {
        let max_in_flight = max_in_flight.max(1);

        Self {
            queue,
            tracker,
            in_flight: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    /// Sends `event` to the queue and, when it is fully geotagged, to the
    /// click tracker of its account.
    ///
    /// Partial geolocation (any of latitude, longitude or country missing)
    /// skips the tracker entirely.
    pub async fn dispatch(&self, event: ClickEvent) {
        let enqueue = async {
            if let Err(e) = self.queue.send(event.clone()).await {
                warn!("Failed to enqueue click for {}: {}", event.link_id, e);
                counter!("click_dispatch_failures_total", "sink" => "queue").increment(1);
            }
        };

        let track = async {
            let Some(click) = event.geo_click() else {
                debug!(
                    "Click on {} lacks full geolocation, not tracked",
                    event.link_id
                );
                return;
            };

            if let Err(e) = self.tracker.add_click(&event.account_id, click).await {
                warn!(
                    "Failed to record click for account {}: {}",
                    event.account_id, e
                );
                counter!("click_dispatch_failures_total", "sink" => "click_tracker").increment(1);
            }
        };

        tokio::join!(enqueue, track);
    }

    /// Runs [`Self::dispatch`] in the background without waiting for it.
    ///
    /// Returns `false` (and drops the click) when `max_in_flight` dispatches
    /// are already running.
    pub fn spawn_dispatch(self: &Arc<Self>, event: ClickEvent) -> bool {
        let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
            warn!("Dispatch capacity exhausted, dropping click on {}", event.link_id);
            counter!("click_dispatch_dropped_total").increment(1);
            return false;
        };

        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
            drop(permit);
        });

        true
    }

    /// Waits for every background dispatch to finish, up to `wait`.
    ///
    /// Returns `false` if some were still running when time ran out.
    pub async fn drain(&self, wait: Duration) -> bool {
        matches!(
            timeout(wait, self.in_flight.acquire_many(self.max_in_flight)).await,
            Ok(Ok(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actors::{ActorError, MockClickTracker};
    use crate::domain::queue::{DispatchError, MockClickQueue};

    fn event(country: Option<&str>, latitude: Option<f64>, longitude: Option<f64>) -> ClickEvent {
        ClickEvent::new(
            "acc_1".to_string(),
            "abc123".to_string(),
            "https://example.fr".to_string(),
            country.map(str::to_string),
            latitude,
            longitude,
        )
    }

    #[tokio::test]
    async fn test_dispatch_reaches_both_sinks() {
        let mut mock_queue = MockClickQueue::new();
        let mut mock_tracker = MockClickTracker::new();

        mock_queue
            .expect_send()
            .withf(|event| event.link_id == "abc123" && event.account_id == "acc_1")
            .times(1)
            .returning(|_| Ok(()));
        mock_tracker
            .expect_add_click()
            .withf(|account_id, click| {
                account_id == "acc_1"
                    && click.country == "FR"
                    && click.latitude == 48.85
                    && click.longitude == 2.35
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher = ClickDispatcher::new(Arc::new(mock_queue), Arc::new(mock_tracker), 8);
        dispatcher
            .dispatch(event(Some("FR"), Some(48.85), Some(2.35)))
            .await;
    }

    #[tokio::test]
    async fn test_tracker_failure_does_not_block_queue() {
        let mut mock_queue = MockClickQueue::new();
        let mut mock_tracker = MockClickTracker::new();

        mock_queue.expect_send().times(1).returning(|_| Ok(()));
        mock_tracker
            .expect_add_click()
            .times(1)
            .returning(|_, _| Err(ActorError::Unavailable("acc_1".to_string())));

        let dispatcher = ClickDispatcher::new(Arc::new(mock_queue), Arc::new(mock_tracker), 8);
        dispatcher
            .dispatch(event(Some("FR"), Some(48.85), Some(2.35)))
            .await;
    }

    #[tokio::test]
    async fn test_queue_failure_does_not_block_tracker() {
        let mut mock_queue = MockClickQueue::new();
        let mut mock_tracker = MockClickTracker::new();

        mock_queue
            .expect_send()
            .times(1)
            .returning(|_| Err(DispatchError::QueueFull));
        mock_tracker
            .expect_add_click()
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher = ClickDispatcher::new(Arc::new(mock_queue), Arc::new(mock_tracker), 8);
        dispatcher
            .dispatch(event(Some("FR"), Some(48.85), Some(2.35)))
            .await;
    }

    #[tokio::test]
    async fn test_partial_geolocation_skips_tracker() {
        let mut mock_queue = MockClickQueue::new();
        let mut mock_tracker = MockClickTracker::new();

        mock_queue.expect_send().times(3).returning(|_| Ok(()));
        mock_tracker.expect_add_click().times(0);

        let dispatcher = ClickDispatcher::new(Arc::new(mock_queue), Arc::new(mock_tracker), 8);
        dispatcher.dispatch(event(Some("FR"), Some(48.85), None)).await;
        dispatcher.dispatch(event(Some("FR"), None, Some(2.35))).await;
        dispatcher.dispatch(event(None, Some(48.85), Some(2.35))).await;
    }

    #[tokio::test]
    async fn test_spawned_dispatches_are_drained() {
        let mut mock_queue = MockClickQueue::new();
        let mut mock_tracker = MockClickTracker::new();

        mock_queue.expect_send().times(2).returning(|_| Ok(()));
        mock_tracker.expect_add_click().times(0);

        let dispatcher = Arc::new(ClickDispatcher::new(
            Arc::new(mock_queue),
            Arc::new(mock_tracker),
            8,
        ));

        assert!(dispatcher.spawn_dispatch(event(None, None, None)));
        assert!(dispatcher.spawn_dispatch(event(None, None, None)));
        assert!(dispatcher.drain(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_spawn_dispatch_drops_when_saturated() {
        let mock_queue = MockClickQueue::new();
        let mock_tracker = MockClickTracker::new();

        let dispatcher = Arc::new(ClickDispatcher::new(
            Arc::new(mock_queue),
            Arc::new(mock_tracker),
            1,
        ));

        let _held = dispatcher.in_flight.clone().try_acquire_owned().unwrap();

        assert!(!dispatcher.spawn_dispatch(event(None, None, None)));
    }
}
