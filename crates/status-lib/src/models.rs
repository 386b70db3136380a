//! Core data models for the status exporter

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Separator the engine prefixes container names with
pub const NAME_SEPARATOR: char = '/';

/// Normalized container status label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    /// Container is not running (exited, created, paused, dead, ...)
    Exited,
    /// Running without a configured health check
    Running,
    /// Running and the health check passes
    Healthy,
    /// Running and the health check is failing or not yet passing
    Unhealthy,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 4] = [
        CanonicalStatus::Exited,
        CanonicalStatus::Running,
        CanonicalStatus::Healthy,
        CanonicalStatus::Unhealthy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Exited => "exited",
            CanonicalStatus::Running => "running",
            CanonicalStatus::Healthy => "healthy",
            CanonicalStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one aggregation pass: container display name -> status
///
/// Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusReport(HashMap<String, CanonicalStatus>);

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a status, replacing any previous entry with the same name
    pub fn insert(&mut self, name: impl Into<String>, status: CanonicalStatus) {
        self.0.insert(name.into(), status);
    }

    pub fn get(&self, name: &str) -> Option<CanonicalStatus> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CanonicalStatus)> {
        self.0.iter().map(|(name, status)| (name.as_str(), *status))
    }

    /// Number of containers reported with the given status
    pub fn count(&self, status: CanonicalStatus) -> usize {
        self.0.values().filter(|s| **s == status).count()
    }
}

impl FromIterator<(String, CanonicalStatus)> for StatusReport {
    fn from_iter<I: IntoIterator<Item = (String, CanonicalStatus)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Derive the display name of a container from the engine's name list.
///
/// Takes the first name and strips a single leading separator. Returns
/// `None` when there are no names or the result is empty.
pub fn display_name(names: &[String]) -> Option<String> {
    let first = names.first()?;
    let name = first.strip_prefix(NAME_SEPARATOR).unwrap_or(first);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
