//! stackbeat-notify — heartbeat delivery to a dead-man's-switch endpoint.
//!
//! [`HttpSink`] sends a single `POST` with a `text/plain` body per ping.
//! `https` URLs are served over rustls with the Mozilla root store; each
//! ping opens its own connection and is bounded by a fixed timeout.

pub mod sink;
pub mod tls;

pub use sink::{CONTENT_TYPE, HttpSink};
pub use tls::client_config;
