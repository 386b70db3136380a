//! Read-only queries against the local container engine
//!
//! Two interchangeable bindings are provided: the engine's HTTP API over
//! its Unix socket, and the engine's command-line client. Both are
//! exposed to the aggregator through [`EngineClient`].

mod cli;
mod socket;

pub use cli::CliEngineClient;
pub use socket::SocketEngineClient;

use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Run status string the engine reports for a running container
pub const RUNNING: &str = "running";

/// Health status string the engine reports for a passing health check
pub const HEALTHY: &str = "healthy";

/// One entry of the "list all containers" query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContainerSummary {
    /// Identifier accepted by [`EngineClient::inspect_container`]
    pub id: String,
    /// Names as reported by the engine, possibly with a leading `/`
    pub names: Vec<String>,
}

impl RawContainerSummary {
    pub fn new(id: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            id: id.into(),
            names,
        }
    }
}

/// Health-check block of an inspected container
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawHealth {
    #[serde(rename = "Status", default)]
    pub status: String,
}

/// State of one container as returned by the "inspect" query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawContainerState {
    #[serde(rename = "Status", default)]
    pub run_status: String,
    /// `None` when no health check is configured
    #[serde(rename = "Health", alias = "Healthcheck", default)]
    pub health: Option<RawHealth>,
}

impl RawContainerState {
    pub fn new(run_status: impl Into<String>) -> Self {
        Self {
            run_status: run_status.into(),
            health: None,
        }
    }

    pub fn with_health(mut self, status: impl Into<String>) -> Self {
        self.health = Some(RawHealth {
            status: status.into(),
        });
        self
    }
}

/// Trait for container engine query implementations
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// List all containers, including stopped ones
    async fn list_containers(&self) -> Result<Vec<RawContainerSummary>, EngineError>;

    /// Inspect the state of a single container
    async fn inspect_container(&self, id: &str) -> Result<RawContainerState, EngineError>;
}

/// Which engine binding to use, parsed case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EngineBackend {
    /// Engine HTTP API over a Unix domain socket
    #[default]
    Socket,
    /// Engine command-line client
    Cli,
}

impl EngineBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineBackend::Socket => "socket",
            EngineBackend::Cli => "cli",
        }
    }
}

impl FromStr for EngineBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("socket") {
            Ok(EngineBackend::Socket)
        } else if s.eq_ignore_ascii_case("cli") {
            Ok(EngineBackend::Cli)
        } else {
            Err(format!(
                "unknown engine backend `{}`, expected `socket` or `cli`",
                s
            ))
        }
    }
}

impl TryFrom<String> for EngineBackend {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

/// Connection settings for the engine bindings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backend: EngineBackend,
    pub socket_path: String,
    pub binary: String,
    pub timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: EngineBackend::Socket,
            socket_path: "/var/run/docker.sock".to_string(),
            binary: "docker".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Create the engine client for the configured backend
pub fn create_engine_client(
    settings: &EngineSettings,
) -> Result<Arc<dyn EngineClient>, EngineError> {
    match settings.backend {
        EngineBackend::Socket => {
            tracing::info!(
                socket = %settings.socket_path,
                "Using engine API over Unix socket"
            );
            Ok(Arc::new(SocketEngineClient::connect(
                &settings.socket_path,
                settings.timeout,
            )?))
        }
        EngineBackend::Cli => {
            tracing::info!(binary = %settings.binary, "Using engine command-line client");
            Ok(Arc::new(CliEngineClient::new(
                &settings.binary,
                settings.timeout,
            )))
        }
    }
}
