//! Status library for the container status exporter
//!
//! This crate provides the core functionality for:
//! - Querying a local container engine (API socket or CLI)
//! - Normalizing raw engine state into canonical status labels
//! - Aggregating a name -> status report for every container
//! - Observability (Prometheus counters, structured logging)

pub mod aggregator;
pub mod engine;
pub mod error;
pub mod models;
pub mod normalize;
pub mod observability;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use engine::{
    create_engine_client, EngineBackend, EngineClient, EngineSettings, RawContainerState,
    RawContainerSummary, RawHealth,
};
pub use error::{AggregationError, EngineError};
pub use models::{CanonicalStatus, StatusReport};
pub use normalize::normalize;
pub use observability::{StatusMetrics, StructuredLogger};
