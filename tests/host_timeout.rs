//! Integration tests for host-side budget enforcement
//!
//! The timeout fixture's response only reaches a caller that does not enforce
//! a budget.

use lambda_probe::handler::timeout::{TimeoutHandler, LEAKED_CONTENT, UNREACHABLE_RESPONSE};
use lambda_probe::handler::GreetingHandler;
use lambda_probe::{Host, InvocationOutcome};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn leak_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "lambda_probe_host_{}_{}.txt",
        name,
        uuid::Uuid::new_v4()
    ))
}

#[test]
fn test_budget_shorter_than_sleep_times_out() {
    let path = leak_path("timed_out");
    let handler =
        TimeoutHandler::new(&path, Duration::from_millis(800), Duration::from_millis(100));
    let host = Host::new(Arc::new(handler))
        .with_budget(Duration::from_millis(100))
        .unwrap();

    let start = Instant::now();
    let outcome = host.invoke(Value::Null);

    assert!(outcome.is_timed_out(), "unexpected outcome: {:?}", outcome);
    assert!(outcome.response().is_none());
    // The caller stops waiting at the budget, not at the end of the sleep
    assert!(start.elapsed() < Duration::from_millis(700));
    // The leak happens before the sleep, so the file exists regardless
    assert_eq!(std::fs::read_to_string(&path).unwrap(), LEAKED_CONTENT);
}

#[test]
fn test_untimed_host_delivers_constant() {
    let path = leak_path("untimed");
    let handler = TimeoutHandler::new(&path, Duration::from_millis(50), Duration::from_millis(10));
    let host = Host::new(Arc::new(handler));

    match host.invoke(Value::Null) {
        InvocationOutcome::Completed {
            response,
            elapsed_ms,
            ..
        } => {
            assert_eq!(response, UNREACHABLE_RESPONSE);
            assert!(elapsed_ms >= 50);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_generous_budget_completes() {
    let path = leak_path("generous");
    let handler = TimeoutHandler::new(&path, Duration::from_millis(20), Duration::from_millis(10));
    let host = Host::new(Arc::new(handler))
        .with_budget(Duration::from_secs(5))
        .unwrap();

    assert_eq!(host.invoke(Value::Null).response(), Some(UNREACHABLE_RESPONSE));
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_greeting_through_timed_host() {
    let host = Host::new(Arc::new(GreetingHandler))
        .with_budget(Duration::from_secs(2))
        .unwrap();

    assert_eq!(host.invoke(json!("World")).response(), Some("Hello, World"));
    assert_eq!(host.invoke(Value::Null).response(), Some("Hello, null"));
}
