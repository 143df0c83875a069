//! Shared application state for request handlers.

use axum::http::HeaderName;
use std::sync::Arc;

use crate::application::services::{ClickDispatcher, ResolutionService};
use crate::domain::actors::ClickTracker;
use crate::domain::queue::ClickQueue;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::queue::ChannelQueue;

/// Header carrying the visitor latitude.
pub const LATITUDE_HEADER: &str = "x-latitude";
/// Header carrying the visitor longitude.
pub const LONGITUDE_HEADER: &str = "x-longitude";

/// Application state shared across all request handlers.
///
/// Cloned for each request (cheap Arc clones). Contains the routing services
/// and the infrastructure handles checked by `/health`.
#[derive(Clone)]
pub struct AppState {
    pub resolution_service: Arc<ResolutionService<dyn LinkRepository, dyn CacheService>>,
    pub click_dispatcher: Arc<ClickDispatcher<dyn ClickQueue, dyn ClickTracker>>,
    pub link_repository: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub click_queue: Arc<ChannelQueue>,
    /// Header the visitor country is read from.
    pub country_header: HeaderName,
}
