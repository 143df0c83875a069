//! PostgreSQL repository implementations.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Authoritative link record storage

pub mod pg_link_repository;

pub use pg_link_repository::PgLinkRepository;
