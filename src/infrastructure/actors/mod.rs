//! In-process actor runtime and the click actors built on it.
//!
//! - [`ActorRegistry`] - Address-to-mailbox map spawning one task per key
//! - [`ActorClickTracker`] - Per-account click history
//! - [`ActorEvalScheduler`] - Per-(link, destination) evaluation scheduling

mod click_tracker;
mod eval_scheduler;
mod registry;

pub use click_tracker::{ActorClickTracker, ClickTrackerActor, ClickTrackerMessage};
pub use eval_scheduler::{
    ActorEvalScheduler, EvalSchedulerActor, EvalSchedulerMessage, EvalSnapshot, EvalState,
    LinkClick,
};
pub use registry::{Actor, ActorRegistry};
