//! stackbeat-health — decide and report the health of a compose project.
//!
//! Every poll cycle lists the project's containers, classifies them, and
//! sends one aggregated heartbeat. Success pings are sent on every healthy
//! cycle; failure pings are held back until the failure streak reaches the
//! configured threshold.
//!
//! # Architecture
//!
//! ```text
//! Poller::run (Running ⇄ checkpoint → Stopped)
//!   ├── InventoryProvider::list() → observations
//!   ├── classify() → Classification
//!   ├── Reporter::evaluate(outcome, streak) → (streak', Action)
//!   └── NotificationSink::post(success | failure url)
//! ```
//!
//! Cancellation is a `watch` channel checked only between cycles; a cycle
//! that has started always finishes.

pub mod classifier;
pub mod poller;
pub mod reporter;

pub use classifier::classify;
pub use poller::{LoopState, PollSummary, Poller};
pub use reporter::{Action, CycleOutcome, ErrorStreak, Reporter};
