//! Engine binding through the engine's command-line client
//!
//! Runs `<binary> ps -a` for listing and `<binary> inspect` for state,
//! parsing their stdout. Works with any Docker-compatible CLI.

use super::{EngineClient, RawContainerState, RawContainerSummary};
use crate::error::EngineError;
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Engine client shelling out to a CLI binary
#[derive(Debug, Clone)]
pub struct CliEngineClient {
    binary: String,
    timeout: Duration,
}

impl CliEngineClient {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Run the binary with `args`, enforcing the timeout
    async fn run(&self, args: &[&str]) -> Result<Output, EngineError> {
        let mut command = Command::new(&self.binary);
        command.args(args).kill_on_drop(true);

        debug!(binary = %self.binary, args = ?args, "Running engine command");

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(EngineError::Unavailable(format!(
                "failed to run {}: {}",
                self.binary, e
            ))),
            Err(_) => Err(EngineError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl EngineClient for CliEngineClient {
    async fn list_containers(&self) -> Result<Vec<RawContainerSummary>, EngineError> {
        let output = self.run(&["ps", "-a", "--format", "{{.Names}}"]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Protocol(format!(
                "{} ps failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        Ok(parse_ps_output(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn inspect_container(&self, id: &str) -> Result<RawContainerState, EngineError> {
        let output = self
            .run(&["inspect", "--format", "{{json .State}}", id])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such") {
                return Err(EngineError::NotFound(id.to_string()));
            }
            return Err(EngineError::Protocol(format!(
                "{} inspect failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        parse_state_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `ps --format {{.Names}}` output, one container per line.
///
/// A line may carry several comma-separated names; the first one doubles
/// as the identifier passed to `inspect`.
fn parse_ps_output(stdout: &str) -> Vec<RawContainerSummary> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let names: Vec<String> = line
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
            let id = names.first().cloned().unwrap_or_default();
            RawContainerSummary::new(id, names)
        })
        .collect()
}

/// Parse `inspect --format {{json .State}}` output
fn parse_state_output(stdout: &str) -> Result<RawContainerState, EngineError> {
    serde_json::from_str(stdout.trim())
        .map_err(|e| EngineError::Protocol(format!("failed to parse container state: {}", e)))
}
