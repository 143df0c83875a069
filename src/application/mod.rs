//! Application layer services implementing the routing logic.
//!
//! Services consume the domain traits (link repository, cache, queue, actors)
//! and expose a small API to the HTTP handlers and the background worker.
//!
//! # Available Services
//!
//! - [`services::ResolutionService`] - Cache-aside link record lookup
//! - [`services::ClickDispatcher`] - Click fan-out to the queue and click tracker
//! - [`services::EvaluationService`] - Evaluation scheduling for dequeued clicks
//! - [`click_worker::run_click_worker`] - Click queue consumer

pub mod click_worker;
pub mod services;
