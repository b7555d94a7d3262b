//! stackbeat-docker — container inventory backed by the Docker Engine API.
//!
//! Lists every container (running or not) carrying the compose project
//! label and turns each into a [`stackbeat_core::ContainerObservation`].

pub mod inventory;

pub use inventory::{DockerInventory, PROJECT_LABEL, SERVICE_LABEL};
