//! Core domain entities representing the routing data model.
//!
//! # Entity Types
//!
//! - [`LinkRecord`] - A short link and its per-country destinations
//!
//! Click data lives in [`crate::domain::click_event`] since it only exists in
//! transit between the redirect handler and its sinks.

pub mod link;

pub use link::{DEFAULT_DESTINATION_KEY, LinkRecord, LinkRecordError};
