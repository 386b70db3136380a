//! Agent configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use status_lib::{AggregatorConfig, EngineBackend, EngineSettings};
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Engine binding: `socket` or `cli`
    #[serde(default)]
    pub engine_backend: EngineBackend,

    /// Engine API socket path (socket backend)
    #[serde(default = "default_engine_socket")]
    pub engine_socket: String,

    /// Engine CLI executable (cli backend)
    #[serde(default = "default_engine_binary")]
    pub engine_binary: String,

    /// Timeout for a single engine query in seconds
    #[serde(default = "default_engine_timeout")]
    pub engine_timeout_secs: u64,

    /// Timeout for a whole HTTP request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Global request ceiling per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_sec: u32,

    /// Parallel inspect calls per aggregation pass
    #[serde(default = "default_inspect_concurrency")]
    pub inspect_concurrency: usize,
}

fn default_port() -> u16 {
    9066
}

fn default_engine_socket() -> String {
    "/var/run/docker.sock".to_string()
}

fn default_engine_binary() -> String {
    "docker".to_string()
}

fn default_engine_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_rate_limit() -> u32 {
    2
}

fn default_inspect_concurrency() -> usize {
    8
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            engine_backend: EngineBackend::default(),
            engine_socket: default_engine_socket(),
            engine_binary: default_engine_binary(),
            engine_timeout_secs: default_engine_timeout(),
            request_timeout_secs: default_request_timeout(),
            rate_limit_per_sec: default_rate_limit(),
            inspect_concurrency: default_inspect_concurrency(),
        }
    }
}

/// Environment source; empty variables fall back to the defaults
fn environment() -> config::Environment {
    config::Environment::default()
        .try_parsing(true)
        .ignore_empty(true)
}

impl AgentConfig {
    /// Load configuration from the process environment (`PORT`, `ENGINE_BACKEND`, ...)
    pub fn load() -> Result<Self> {
        Self::from_environment(environment())
    }

    fn from_environment(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            backend: self.engine_backend,
            socket_path: self.engine_socket.clone(),
            binary: self.engine_binary.clone(),
            timeout: Duration::from_secs(self.engine_timeout_secs),
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            inspect_concurrency: self.inspect_concurrency.max(1),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
