//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`cache`] - Link record cache (Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL record store
//! - [`queue`] - Channel-backed click queue
//! - [`actors`] - Keyed actor runtime with the click tracker and evaluation scheduler
//! - [`workflow`] - Default evaluation workflow binding

pub mod actors;
pub mod cache;
pub mod persistence;
pub mod queue;
pub mod workflow;
