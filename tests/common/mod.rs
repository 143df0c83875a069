#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum::http::HeaderName;
use link_router::application::services::{ClickDispatcher, ResolutionService, ResolverConfig};
use link_router::domain::actors::{ActorError, ClickTracker};
use link_router::domain::click_event::{ClickEvent, GeoClick};
use link_router::domain::entities::LinkRecord;
use link_router::domain::queue::ClickQueue;
use link_router::domain::repositories::LinkRepository;
use link_router::error::AppError;
use link_router::infrastructure::cache::{CacheError, CacheResult, CacheService};
use link_router::infrastructure::queue::ChannelQueue;
use link_router::state::AppState;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::Layer;

pub fn create_test_record(id: &str, account_id: &str, entries: &[(&str, &str)]) -> LinkRecord {
    let destinations: BTreeMap<String, String> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    LinkRecord::new(id, account_id, destinations)
}

/// The `abc123` link routing FR visitors to example.fr.
pub fn abc123() -> LinkRecord {
    create_test_record(
        "abc123",
        "acc_1",
        &[
            ("default", "https://example.com"),
            ("FR", "https://example.fr"),
        ],
    )
}

/// Record store backed by a map, counting lookups.
#[derive(Default)]
pub struct InMemoryLinkRepository {
    records: Mutex<HashMap<String, LinkRecord>>,
    fetches: AtomicUsize,
    unhealthy: AtomicBool,
}

impl InMemoryLinkRepository {
    pub fn with_records(records: impl IntoIterator<Item = LinkRecord>) -> Self {
        let repo = Self::default();
        for record in records {
            repo.insert(record);
        }
        repo
    }

    pub fn insert(&self, record: LinkRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<LinkRecord>, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn health_check(&self) -> bool {
        !self.unhealthy.load(Ordering::SeqCst)
    }
}

/// Cache backed by a map, counting writes. TTLs are recorded, not enforced.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
    ttls: Mutex<Vec<Duration>>,
    puts: AtomicUsize,
}

impl InMemoryCache {
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn ttls(&self) -> Vec<Duration> {
        self.ttls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheService for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.ttls.lock().unwrap().push(ttl);
        self.insert_raw(key, value);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Cache whose every operation fails.
pub struct UnreachableCache;

#[async_trait]
impl CacheService for UnreachableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Click tracker keeping every click it receives.
#[derive(Default)]
pub struct RecordingTracker {
    clicks: Mutex<Vec<(String, GeoClick)>>,
}

impl RecordingTracker {
    pub fn clicks(&self) -> Vec<(String, GeoClick)> {
        self.clicks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClickTracker for RecordingTracker {
    async fn add_click(&self, account_id: &str, click: GeoClick) -> Result<(), ActorError> {
        self.clicks
            .lock()
            .unwrap()
            .push((account_id.to_string(), click));
        Ok(())
    }
}

/// Click tracker whose mailbox is always gone.
pub struct UnavailableTracker;

#[async_trait]
impl ClickTracker for UnavailableTracker {
    async fn add_click(&self, account_id: &str, _click: GeoClick) -> Result<(), ActorError> {
        Err(ActorError::Unavailable(account_id.to_string()))
    }
}

pub fn create_test_state(
    repo: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    tracker: Arc<dyn ClickTracker>,
) -> (AppState, mpsc::Receiver<ClickEvent>) {
    let (tx, rx) = mpsc::channel(100);
    let click_queue = Arc::new(ChannelQueue::new(tx));

    let resolution_service = Arc::new(ResolutionService::new(
        repo.clone(),
        cache.clone(),
        ResolverConfig::default(),
    ));
    let click_dispatcher = Arc::new(ClickDispatcher::new(
        click_queue.clone() as Arc<dyn ClickQueue>,
        tracker,
        64,
    ));

    let state = AppState {
        resolution_service,
        click_dispatcher,
        link_repository: repo,
        cache,
        click_queue,
        country_header: HeaderName::from_static("cf-ipcountry"),
    };

    (state, rx)
}

/// Waits for the next click event produced by a background dispatch.
pub async fn next_click(rx: &mut mpsc::Receiver<ClickEvent>) -> Option<ClickEvent> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Inserts a fixed peer address so per-IP middleware works without a socket.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
