//! Domain layer containing the routing model and collaborator contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Link records and their validation
//! - [`destination`] - Country-to-destination selection
//! - [`click_event`] - Click event model shared by every sink
//! - [`repositories`] - Record store trait
//! - [`queue`] - Click queue trait
//! - [`actors`] - Keyed actor contracts (click tracker, evaluation scheduler)
//! - [`workflow`] - Evaluation workflow contract
//!
//! # Click Processing Flow
//!
//! 1. Redirect handler resolves the link and picks a destination
//! 2. A [`click_event::ClickEvent`] is dispatched to the queue and the click tracker
//! 3. The queue consumer notifies the evaluation scheduler for `link:destination`
//! 4. The scheduler starts the evaluation workflow once per pair

pub mod actors;
pub mod click_event;
pub mod destination;
pub mod entities;
pub mod queue;
pub mod repositories;
pub mod workflow;
