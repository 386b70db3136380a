//! Aggregation tests against an in-memory engine
//!
//! The mock engine serves canned list/inspect answers so the partial
//! failure policy can be exercised without a container runtime.

use super::*;
use crate::engine::RawContainerSummary;
use async_trait::async_trait;
use crate::models::CanonicalStatus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Canned answer for one inspect call
#[derive(Clone)]
enum Inspect {
    State(RawContainerState),
    NotFound,
    Unavailable,
    Panic,
    Hang,
}

struct MockEngine {
    list: Mutex<Option<Result<Vec<RawContainerSummary>, EngineError>>>,
    inspects: HashMap<String, Inspect>,
    delay: Duration,
    inspect_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    dropped: Arc<AtomicUsize>,
}

impl MockEngine {
    fn new(containers: Vec<(&str, Vec<&str>, Inspect)>) -> Self {
        let list = containers
            .iter()
            .map(|(id, names, _)| {
                RawContainerSummary::new(*id, names.iter().map(|n| n.to_string()).collect())
            })
            .collect();
        let inspects = containers
            .into_iter()
            .map(|(id, _, inspect)| (id.to_string(), inspect))
            .collect();

        Self {
            list: Mutex::new(Some(Ok(list))),
            inspects,
            delay: Duration::ZERO,
            inspect_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_list(error: EngineError) -> Self {
        let engine = Self::new(vec![]);
        *engine.list.lock().unwrap() = Some(Err(error));
        engine
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Counts inspect futures that were dropped before finishing
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineClient for MockEngine {
    async fn list_containers(&self) -> Result<Vec<RawContainerSummary>, EngineError> {
        self.list
            .lock()
            .unwrap()
            .take()
            .expect("list called more than once")
    }

    async fn inspect_container(&self, id: &str) -> Result<RawContainerState, EngineError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let answer = self.inspects.get(id).cloned();
        let result = match answer {
            Some(Inspect::State(state)) => Ok(state),
            Some(Inspect::NotFound) | None => Err(EngineError::NotFound(id.to_string())),
            Some(Inspect::Unavailable) => {
                Err(EngineError::Unavailable("connection reset".to_string()))
            }
            Some(Inspect::Panic) => panic!("engine exploded"),
            Some(Inspect::Hang) => {
                let _guard = DropGuard(Arc::clone(&self.dropped));
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn aggregator(engine: Arc<MockEngine>, inspect_concurrency: usize) -> Aggregator {
    Aggregator::new(
        engine,
        AggregatorConfig {
            inspect_concurrency,
        },
        StatusMetrics::new(),
        StructuredLogger::new("test"),
    )
}

fn running() -> Inspect {
    Inspect::State(RawContainerState::new("running"))
}

#[tokio::test]
async fn test_mixed_states_are_normalized() {
    let engine = Arc::new(MockEngine::new(vec![
        ("a", vec!["/A"], running()),
        (
            "b",
            vec!["/B"],
            Inspect::State(RawContainerState::new("running").with_health("healthy")),
        ),
        ("c", vec!["/C"], Inspect::State(RawContainerState::new("exited"))),
    ]));

    let report = assert_ok!(aggregator(engine, 8).collect_all().await);

    assert_eq!(report.len(), 3);
    assert_eq!(report.get("A"), Some(CanonicalStatus::Running));
    assert_eq!(report.get("B"), Some(CanonicalStatus::Healthy));
    assert_eq!(report.get("C"), Some(CanonicalStatus::Exited));
}

#[tokio::test]
async fn test_failed_inspect_is_omitted() {
    let engine = Arc::new(MockEngine::new(vec![
        ("first", vec!["/first"], running()),
        ("second", vec!["/second"], Inspect::NotFound),
    ]));

    let report = assert_ok!(aggregator(engine, 8).collect_all().await);

    assert_eq!(report.len(), 1);
    assert_eq!(report.get("first"), Some(CanonicalStatus::Running));
    assert_eq!(report.get("second"), None);
}

#[tokio::test]
async fn test_n_of_m_failures_leave_m_minus_n_entries() {
    let mut containers = Vec::new();
    let ids: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
    let names: Vec<String> = (0..10).map(|i| format!("/svc-{i}")).collect();
    for i in 0..10 {
        let inspect = match i % 3 {
            0 => Inspect::Unavailable,
            1 => Inspect::NotFound,
            _ => running(),
        };
        containers.push((ids[i].as_str(), vec![names[i].as_str()], inspect));
    }
    let engine = Arc::new(MockEngine::new(containers));

    let report = assert_ok!(aggregator(engine.clone(), 3).collect_all().await);

    // i % 3 == 2 for i in 2, 5, 8
    assert_eq!(report.len(), 3);
    assert_eq!(engine.inspect_calls.load(Ordering::SeqCst), 10);
    for name in ["svc-2", "svc-5", "svc-8"] {
        assert_eq!(report.get(name), Some(CanonicalStatus::Running));
    }
}

#[tokio::test]
async fn test_every_inspect_failing_yields_empty_report() {
    let engine = Arc::new(MockEngine::new(vec![
        ("a", vec!["/a"], Inspect::Unavailable),
        ("b", vec!["/b"], Inspect::NotFound),
    ]));

    let report = assert_ok!(aggregator(engine, 8).collect_all().await);
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_list_failure_aborts_pass() {
    let engine = Arc::new(MockEngine::failing_list(EngineError::Unavailable(
        "connection refused".to_string(),
    )));

    let err = assert_err!(aggregator(engine.clone(), 8).collect_all().await);

    assert!(matches!(
        err,
        AggregationError::ListFailed(EngineError::Unavailable(_))
    ));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(engine.inspect_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_engine_yields_empty_report() {
    let engine = Arc::new(MockEngine::new(vec![]));

    let report = assert_ok!(aggregator(engine, 8).collect_all().await);
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_unnamed_containers_are_skipped_without_inspect() {
    let engine = Arc::new(MockEngine::new(vec![
        ("nameless", vec![], running()),
        ("slash", vec!["/"], running()),
        ("web", vec!["/web-1"], running()),
    ]));

    let report = assert_ok!(aggregator(engine.clone(), 8).collect_all().await);

    assert_eq!(report.len(), 1);
    assert_eq!(report.get("web-1"), Some(CanonicalStatus::Running));
    assert_eq!(engine.inspect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duplicate_names_keep_one_entry() {
    let engine = Arc::new(MockEngine::new(vec![
        ("one", vec!["/dup"], running()),
        ("two", vec!["/dup"], running()),
    ]));

    let report = assert_ok!(aggregator(engine, 8).collect_all().await);

    assert_eq!(report.len(), 1);
    assert_eq!(report.get("dup"), Some(CanonicalStatus::Running));
}

#[tokio::test]
async fn test_inspect_concurrency_is_bounded() {
    let ids: Vec<String> = (0..12).map(|i| format!("id-{i}")).collect();
    let names: Vec<String> = (0..12).map(|i| format!("/name-{i}")).collect();
    let containers = (0..12)
        .map(|i| (ids[i].as_str(), vec![names[i].as_str()], running()))
        .collect();
    let engine = Arc::new(MockEngine::new(containers).with_delay(Duration::from_millis(10)));

    let report = assert_ok!(aggregator(engine.clone(), 3).collect_all().await);

    assert_eq!(report.len(), 12);
    let max = engine.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "max in flight was {max}");
}

#[tokio::test]
async fn test_zero_concurrency_still_makes_progress() {
    let engine = Arc::new(MockEngine::new(vec![
        ("a", vec!["/a"], running()),
        ("b", vec!["/b"], running()),
    ]));

    let report = assert_ok!(aggregator(engine.clone(), 0).collect_all().await);

    assert_eq!(report.len(), 2);
    assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_inspect_is_skipped() {
    let engine = Arc::new(MockEngine::new(vec![
        ("ok", vec!["/ok"], running()),
        ("boom", vec!["/boom"], Inspect::Panic),
    ]));

    let report = assert_ok!(aggregator(engine, 8).collect_all().await);

    assert_eq!(report.len(), 1);
    assert_eq!(report.get("ok"), Some(CanonicalStatus::Running));
}

#[tokio::test]
async fn test_dropping_pass_aborts_inflight_inspects() {
    let engine = Arc::new(MockEngine::new(vec![
        ("h1", vec!["/h1"], Inspect::Hang),
        ("h2", vec!["/h2"], Inspect::Hang),
    ]));
    let aggregator = aggregator(engine.clone(), 8);

    let result =
        tokio::time::timeout(Duration::from_millis(50), aggregator.collect_all()).await;
    assert!(result.is_err());

    // Aborted tasks are dropped by the runtime on its next turn
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(engine.inspect_calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.dropped.load(Ordering::SeqCst), 2);
}
