//! Error types for stackbeat.

use thiserror::Error;

/// Result type alias for settings resolution.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// The inventory backend could not enumerate containers.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("container backend unreachable: {0}")]
    Unreachable(String),

    #[error("container listing failed: {0}")]
    List(String),

    #[error("container listing timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A heartbeat notification could not be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid ping url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connect to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    #[error("tls handshake with {host} failed: {reason}")]
    Tls { host: String, reason: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("ping endpoint answered {0}")]
    Status(u16),

    #[error("ping timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Startup configuration could not be resolved.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}
