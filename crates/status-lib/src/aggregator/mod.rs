//! Aggregation of container states into a status report
//!
//! One pass lists every container, inspects each one and normalizes its
//! state. Inspect failures only drop the affected container; a failing
//! list aborts the pass.

#[cfg(test)]
mod tests;

use crate::engine::{EngineClient, RawContainerState};
use crate::error::{AggregationError, EngineError};
use crate::models::{display_name, StatusReport};
use crate::normalize::normalize;
use crate::observability::{StatusMetrics, StructuredLogger};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for aggregation passes
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum number of inspect calls in flight per pass (at least 1)
    pub inspect_concurrency: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            inspect_concurrency: 8,
        }
    }
}

/// Result of inspecting one listed container
struct Inspection {
    id: String,
    name: String,
    state: Result<RawContainerState, EngineError>,
}

/// Drives the list -> inspect -> normalize pipeline
#[derive(Clone)]
pub struct Aggregator {
    engine: Arc<dyn EngineClient>,
    config: AggregatorConfig,
    metrics: StatusMetrics,
    logger: StructuredLogger,
}

impl Aggregator {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        config: AggregatorConfig,
        metrics: StatusMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            engine,
            config,
            metrics,
            logger,
        }
    }

    /// Run one aggregation pass.
    ///
    /// Fails only when the engine cannot list containers. Containers
    /// without a usable name or whose inspect fails are left out of the
    /// report. Dropping the returned future aborts in-flight inspects.
    pub async fn collect_all(&self) -> Result<StatusReport, AggregationError> {
        let start = Instant::now();
        self.metrics.inc_aggregation_passes();

        let containers = match self.engine.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                self.metrics.inc_list_failures();
                self.logger.log_list_failed(&e.to_string());
                return Err(AggregationError::ListFailed(e));
            }
        };

        let listed = containers.len();
        let limit = self.config.inspect_concurrency.max(1);
        let mut report = StatusReport::new();
        let mut skipped = 0usize;
        let mut tasks = JoinSet::new();

        for container in containers {
            let Some(name) = display_name(&container.names) else {
                debug!(container_id = %container.id, "Skipping container without a name");
                continue;
            };

            while tasks.len() >= limit {
                if let Some(joined) = tasks.join_next().await {
                    skipped += self.record(&mut report, joined);
                }
            }

            let engine = Arc::clone(&self.engine);
            tasks.spawn(async move {
                let state = engine.inspect_container(&container.id).await;
                Inspection {
                    id: container.id,
                    name,
                    state,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            skipped += self.record(&mut report, joined);
        }

        let elapsed = start.elapsed();
        self.metrics.observe_aggregation_latency(elapsed.as_secs_f64());
        self.metrics.record_report(&report);
        self.logger.log_aggregation(listed, report.len(), skipped, elapsed);

        Ok(report)
    }

    /// Fold one finished inspect into the report; returns 1 if it was skipped
    fn record(&self, report: &mut StatusReport, joined: Result<Inspection, JoinError>) -> usize {
        match joined {
            Ok(Inspection {
                name,
                state: Ok(state),
                ..
            }) => {
                report.insert(name, normalize(&state));
                0
            }
            Ok(Inspection {
                id,
                name,
                state: Err(e),
            }) => {
                self.metrics.inc_inspect_skipped();
                self.logger.log_inspect_skipped(&id, &name, &e.to_string());
                1
            }
            Err(e) => {
                self.metrics.inc_inspect_skipped();
                warn!(error = %e, "Inspect task did not complete");
                1
            }
        }
    }
}
