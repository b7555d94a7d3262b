//! Collaborator seams for the poll loop.
//!
//! The loop only ever talks to an inventory backend and a notification
//! sink through these traits, so tests can inject in-memory fakes.

use std::future::Future;
use std::pin::Pin;

use crate::error::{DeliveryError, InventoryError};
use crate::types::ContainerObservation;

/// Future returned by [`InventoryProvider::list`].
pub type InventoryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ContainerObservation>, InventoryError>> + Send + 'a>>;

/// Future returned by [`NotificationSink::post`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

/// Enumerates the containers belonging to a compose project.
pub trait InventoryProvider: Send + Sync {
    /// List every container of `project`, stopped ones included.
    fn list<'a>(&'a self, project: &'a str) -> InventoryFuture<'a>;
}

/// Delivers a plain-text heartbeat to a URL.
pub trait NotificationSink: Send + Sync {
    /// POST `body` as `text/plain` to `url`.
    fn post<'a>(&'a self, url: &'a str, body: String) -> DeliveryFuture<'a>;
}
