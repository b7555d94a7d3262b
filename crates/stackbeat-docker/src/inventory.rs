//! Docker-backed [`InventoryProvider`].

use std::collections::HashMap;
use std::time::Duration;

use bollard::Docker;
use bollard::container::ListContainersOptions;
use bollard::errors::Error as DockerError;
use bollard::models::ContainerSummary;
use tracing::{debug, info, warn};

use stackbeat_core::settings::CLIENT_TIMEOUT;
use stackbeat_core::{ContainerObservation, InventoryError, InventoryFuture, InventoryProvider};

/// Label compose puts on every container of a project.
pub const PROJECT_LABEL: &str = "com.docker.compose.project";

/// Label holding the compose service name.
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Lists compose containers through a Docker client.
#[derive(Clone)]
pub struct DockerInventory {
    docker: Docker,
    timeout: Duration,
}

impl DockerInventory {
    /// Connect using the Docker defaults (`DOCKER_HOST` or the local socket)
    /// and negotiate the API version.
    ///
    /// A failed negotiation keeps the client's default version.
    pub async fn connect() -> Result<Self, InventoryError> {
        let docker = Docker::connect_with_defaults()
            .map_err(|e| InventoryError::Unreachable(e.to_string()))?;

        let docker = match docker.clone().negotiate_version().await {
            Ok(negotiated) => {
                info!(api_version = ?negotiated.client_version(), "docker api negotiated");
                negotiated
            }
            Err(e) => {
                warn!(error = %e, "docker api version negotiation failed, using client default");
                docker
            }
        };

        Ok(Self::from_client(docker))
    }

    /// Wrap an already configured client.
    pub fn from_client(docker: Docker) -> Self {
        Self {
            docker,
            timeout: CLIENT_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn list_project(&self, project: &str) -> Result<Vec<ContainerObservation>, InventoryError> {
        let options = list_options(project);
        let containers = tokio::time::timeout(self.timeout, self.docker.list_containers(Some(options)))
            .await
            .map_err(|_| InventoryError::Timeout(self.timeout))?
            .map_err(map_docker_error)?;

        debug!(%project, containers = containers.len(), "docker containers listed");
        Ok(containers.iter().map(observation_from_summary).collect())
    }
}

impl InventoryProvider for DockerInventory {
    fn list<'a>(&'a self, project: &'a str) -> InventoryFuture<'a> {
        Box::pin(self.list_project(project))
    }
}

/// All containers, stopped ones included, labelled with `project`.
fn list_options(project: &str) -> ListContainersOptions<String> {
    let filters = HashMap::from([(
        "label".to_string(),
        vec![format!("{PROJECT_LABEL}={project}")],
    )]);
    ListContainersOptions {
        all: true,
        filters,
        ..Default::default()
    }
}

/// Missing fields become empty strings.
fn observation_from_summary(summary: &ContainerSummary) -> ContainerObservation {
    let service_name = summary
        .labels
        .as_ref()
        .and_then(|labels| labels.get(SERVICE_LABEL))
        .cloned()
        .unwrap_or_default();

    ContainerObservation {
        service_name,
        runtime_state: summary.state.clone().unwrap_or_default(),
        status_text: summary.status.clone().unwrap_or_default(),
    }
}

fn map_docker_error(e: DockerError) -> InventoryError {
    match e {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => InventoryError::List(format!("{status_code}: {message}")),
        other => InventoryError::Unreachable(other.to_string()),
    }
}
