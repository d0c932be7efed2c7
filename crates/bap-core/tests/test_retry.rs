#[allow(dead_code)]
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use bap_core::backend::Backend;
use bap_core::catalog::SensorId;
use bap_core::error::{BapError, Result};
use bap_core::image::{Grid, Image};
use bap_core::query::Query;
use bap_core::retry::{Executor, RetryPolicy};

use common::{date, grid, l8_scene};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Backend failing its first `failures` fetches.
struct FlakyBackend {
    failures: usize,
    transient: bool,
    calls: AtomicUsize,
}

impl FlakyBackend {
    fn new(failures: usize, transient: bool) -> Self {
        Self {
            failures,
            transient,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Backend for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    fn grid(&self) -> Grid {
        grid(1, 1)
    }

    fn collection(&self, _sensor: SensorId) -> Result<Vec<Image>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(if self.transient {
                BapError::Transient(format!("too many concurrent aggregations ({call})"))
            } else {
                BapError::Backend("collection not found".into())
            });
        }
        Ok(vec![l8_scene("a", date(2020, 7, 1), (1, 1), 1.0, &[0.0])])
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[test]
fn test_transient_error_is_retried() {
    let backend = FlakyBackend::new(2, true);
    let executor = Executor::new(&backend, RetryPolicy::new(3, 0));
    let images = executor
        .evaluate("L8SR 2020", &Query::sensor(SensorId::Landsat8Sr))
        .unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(backend.calls(), 3);
}

#[test]
fn test_exhausted_retries_return_last_error() {
    let backend = FlakyBackend::new(10, true);
    let executor = Executor::new(&backend, RetryPolicy::new(3, 0));
    let err = executor
        .evaluate("L8SR 2020", &Query::sensor(SensorId::Landsat8Sr))
        .unwrap_err();
    assert_eq!(backend.calls(), 3);
    match err {
        BapError::Transient(msg) => assert_eq!(msg, "too many concurrent aggregations (2)"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_permanent_error_is_not_retried() {
    let backend = FlakyBackend::new(1, false);
    let executor = Executor::new(&backend, RetryPolicy::new(5, 0));
    let err = executor
        .evaluate("L8SR 2020", &Query::sensor(SensorId::Landsat8Sr))
        .unwrap_err();
    assert!(matches!(err, BapError::Backend(_)));
    assert!(!err.is_transient());
    assert_eq!(backend.calls(), 1);
}

#[test]
fn test_zero_attempts_runs_once() {
    let backend = FlakyBackend::new(1, true);
    let executor = Executor::new(&backend, RetryPolicy::new(0, 0));
    assert!(executor
        .evaluate("L8SR 2020", &Query::sensor(SensorId::Landsat8Sr))
        .is_err());
    assert_eq!(backend.calls(), 1);
}

#[test]
fn test_run_passes_value_through() {
    let mut attempts = 0;
    let value = RetryPolicy::new(4, 0)
        .run("counter", || {
            attempts += 1;
            if attempts < 4 {
                Err(BapError::Transient("busy".into()))
            } else {
                Ok(attempts * 10)
            }
        })
        .unwrap();
    assert_eq!(value, 40);
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.attempts, 5);
    assert_eq!(policy.backoff_ms, 2_000);
    let parsed: RetryPolicy = serde_json::from_str(r#"{"attempts":2}"#).unwrap();
    assert_eq!(parsed, RetryPolicy::new(2, 2_000));
}
