//! stackbeat-core — shared domain model for the stackbeat agent.
//!
//! Holds the types every other crate agrees on: container observations as
//! reported by an inventory backend, the per-service classification, the
//! ignore list, resolved runtime settings, and the two collaborator traits
//! the poll loop is written against.
//!
//! # Architecture
//!
//! ```text
//! InventoryProvider ──list(project)──► Vec<ContainerObservation>
//!                                            │
//!                                  IgnoreSet │ classify (stackbeat-health)
//!                                            ▼
//!                                      Classification
//!                                            │
//! NotificationSink ◄──post(url, body)── Reporter decision
//! ```

pub mod error;
pub mod ignore;
pub mod provider;
pub mod settings;
pub mod types;

pub use error::{DeliveryError, InventoryError, SettingsError, SettingsResult};
pub use ignore::IgnoreSet;
pub use provider::{DeliveryFuture, InventoryFuture, InventoryProvider, NotificationSink};
pub use settings::{PingTargets, RawSettings, Settings};
pub use types::*;
