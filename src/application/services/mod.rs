//! Services behind the redirect path and the click queue consumer.

pub mod click_dispatcher;
pub mod evaluation_service;
pub mod resolution_service;

pub use click_dispatcher::{ClickDispatcher, DEFAULT_MAX_IN_FLIGHT};
pub use evaluation_service::EvaluationService;
pub use resolution_service::{DEFAULT_CACHE_TTL, ResolutionService, ResolverConfig};
