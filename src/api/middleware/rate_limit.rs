//! Per-IP rate limiting for the public redirect route.

use anyhow::{Context, Result};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

/// Rate limiter layer keyed by the socket peer address.
pub type RedirectRateLimit =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Token bucket settings for a single client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Seconds after which one request of the quota is replenished.
    pub replenish_seconds: u64,
    /// Requests a client may make in a burst.
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            replenish_seconds: 1,
            burst_size: 100,
        }
    }
}

/// Creates the token bucket layer for the redirect route.
///
/// Requests exceeding the limit receive `429 Too Many Requests`. The router
/// must be served with `into_make_service_with_connect_info::<SocketAddr>`
/// so the peer address is available.
///
/// # Errors
///
/// Returns an error if either setting is zero.
pub fn layer(settings: RateLimitSettings) -> Result<RedirectRateLimit> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(settings.replenish_seconds)
        .burst_size(settings.burst_size)
        .finish()
        .context("Rate limit interval and burst size must be greater than 0")?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
