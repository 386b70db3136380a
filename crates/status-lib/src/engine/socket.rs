//! Engine API binding over a Unix domain socket
//!
//! Issues `GET /containers/json?all=true` and `GET /containers/{id}/json`
//! through bollard.

use super::{EngineClient, RawContainerState, RawContainerSummary, RawHealth};
use crate::error::EngineError;
use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptionsBuilder};
use bollard::Docker;
use std::time::Duration;
use tracing::debug;

/// Engine client talking to the engine API socket
#[derive(Debug, Clone)]
pub struct SocketEngineClient {
    docker: Docker,
    timeout: Duration,
}

impl SocketEngineClient {
    /// Build a client for the socket at `socket_path`.
    ///
    /// No connection is made until the first query.
    pub fn connect(socket_path: &str, timeout: Duration) -> Result<Self, EngineError> {
        let docker = Docker::connect_with_socket(
            socket_path,
            timeout.as_secs(),
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        Ok(Self { docker, timeout })
    }
}

fn map_error(err: BollardError, timeout: Duration) -> EngineError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(message),
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Protocol(format!("status {}: {}", status_code, message)),
        BollardError::RequestTimeoutError => EngineError::Timeout(timeout),
        e @ (BollardError::JsonDataError { .. } | BollardError::JsonSerdeError { .. }) => {
            EngineError::Protocol(e.to_string())
        }
        e => EngineError::Unavailable(e.to_string()),
    }
}

#[async_trait]
impl EngineClient for SocketEngineClient {
    async fn list_containers(&self) -> Result<Vec<RawContainerSummary>, EngineError> {
        let options = ListContainersOptionsBuilder::new().all(true).build();
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| map_error(e, self.timeout))?;

        Ok(containers.into_iter().filter_map(summary_from_api).collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<RawContainerState, EngineError> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error(e, self.timeout))?;

        Ok(state_from_api(response))
    }
}

/// Convert a list entry; entries without an id cannot be inspected
fn summary_from_api(container: ContainerSummary) -> Option<RawContainerSummary> {
    let Some(id) = container.id else {
        debug!(names = ?container.names, "Dropping list entry without id");
        return None;
    };

    Some(RawContainerSummary::new(id, container.names.unwrap_or_default()))
}

fn state_from_api(response: ContainerInspectResponse) -> RawContainerState {
    let Some(state) = response.state else {
        return RawContainerState::default();
    };

    RawContainerState {
        run_status: state.status.map(|s| s.to_string()).unwrap_or_default(),
        health: state.health.map(|health| RawHealth {
            status: health.status.map(|s| s.to_string()).unwrap_or_default(),
        }),
    }
}
