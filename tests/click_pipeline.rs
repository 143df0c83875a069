use async_trait::async_trait;
use link_router::application::click_worker::run_click_worker;
use link_router::application::services::{ClickDispatcher, EvaluationService};
use link_router::domain::click_event::ClickEvent;
use link_router::domain::queue::ClickQueue;
use link_router::domain::workflow::{EvaluationRequest, EvaluationWorkflow, WorkflowError};
use link_router::infrastructure::actors::{ActorClickTracker, ActorEvalScheduler, EvalState};
use link_router::infrastructure::queue::ChannelQueue;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const DELAY: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct RecordingWorkflow {
    started: Mutex<Vec<EvaluationRequest>>,
}

#[async_trait]
impl EvaluationWorkflow for RecordingWorkflow {
    async fn start(&self, request: EvaluationRequest) -> Result<(), WorkflowError> {
        self.started.lock().unwrap().push(request);
        Ok(())
    }
}

fn click(country: Option<&str>, destination: &str, geo: bool) -> ClickEvent {
    ClickEvent::new(
        "acc_1".to_string(),
        "abc123".to_string(),
        destination.to_string(),
        country.map(str::to_string),
        geo.then_some(48.85),
        geo.then_some(2.35),
    )
}

#[tokio::test(start_paused = true)]
async fn test_clicks_flow_from_dispatch_to_evaluation() {
    let workflow = Arc::new(RecordingWorkflow::default());
    let scheduler = Arc::new(ActorEvalScheduler::new(16, DELAY, workflow.clone()));
    let tracker = Arc::new(ActorClickTracker::new(16, 100, DELAY * 2));

    let (tx, rx) = mpsc::channel(100);
    let worker = tokio::spawn(run_click_worker(
        rx,
        Arc::new(EvaluationService::new(scheduler.clone())),
        2,
    ));

    let dispatcher = Arc::new(ClickDispatcher::new(
        Arc::new(ChannelQueue::new(tx)) as Arc<dyn ClickQueue>,
        tracker.clone(),
        16,
    ));

    dispatcher
        .dispatch(click(Some("FR"), "https://example.fr", true))
        .await;
    dispatcher
        .dispatch(click(Some("FR"), "https://example.fr", false))
        .await;
    dispatcher
        .dispatch(click(None, "https://example.com", false))
        .await;

    // Closing the queue lets the worker finish once every event is processed.
    drop(dispatcher);
    worker.await.unwrap();

    let geo_clicks = tracker.recent_clicks("acc_1").await.unwrap();
    assert_eq!(geo_clicks.len(), 1);
    assert_eq!(geo_clicks[0].country, "FR");

    let fr = scheduler
        .snapshot("abc123", "https://example.fr")
        .await
        .unwrap();
    assert_eq!(fr.state, EvalState::Accumulating);
    assert_eq!(fr.total_clicks, 2);

    let fallback = scheduler
        .snapshot("abc123", "https://example.com")
        .await
        .unwrap();
    assert_eq!(fallback.clicks_by_country.get("UNKNOWN"), Some(&1));

    tokio::time::sleep(DELAY + Duration::from_secs(1)).await;
    assert_eq!(scheduler.live_actors(), 0);

    let mut started = workflow.started.lock().unwrap().clone();
    started.sort_by(|a, b| a.destination.cmp(&b.destination));
    assert_eq!(
        started,
        vec![
            EvaluationRequest {
                account_id: "acc_1".to_string(),
                link_id: "abc123".to_string(),
                destination: "https://example.com".to_string(),
            },
            EvaluationRequest {
                account_id: "acc_1".to_string(),
                link_id: "abc123".to_string(),
                destination: "https://example.fr".to_string(),
            },
        ]
    );
}
