/// Timeout fixture
///
/// Opens one file handle and never closes it, then sleeps for longer than the
/// host's execution budget. Under a time-enforcing host the response below is
/// never delivered.
use crate::config::config::ProbeConfig;
use crate::config::types::{FixtureKind, InvocationContext};
use crate::handler::Handler;
use crate::runtime::state::ProcessState;
use crate::utils::sleep::{sleep_unconditionally, SleepOutcome};
use log::{error, info, warn};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Content written to the leaked file
pub const LEAKED_CONTENT: &str = "This file stream will never be closed";

/// Response only observable when the host does not enforce its budget
pub const UNREACHABLE_RESPONSE: &str = "This should never be reached due to timeout";

#[derive(Debug, Clone)]
pub struct TimeoutHandler {
    leak_file: PathBuf,
    sleep: Duration,
    assumed_budget: Duration,
}

impl TimeoutHandler {
    pub fn new(leak_file: impl Into<PathBuf>, sleep: Duration, assumed_budget: Duration) -> Self {
        Self {
            leak_file: leak_file.into(),
            sleep,
            assumed_budget,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.leak_file.clone(),
            config.sleep_duration(),
            config.assumed_budget(),
        )
    }
}

/// Create `path`, write to it, and leak the descriptor whether or not the
/// write succeeded
fn leak_file_stream(path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    let written = file.write_all(LEAKED_CONTENT.as_bytes());
    // Intentional leak: the descriptor stays open until the process exits.
    std::mem::forget(file);
    written
}

impl Handler for TimeoutHandler {
    fn kind(&self) -> FixtureKind {
        FixtureKind::Timeout
    }

    fn handle(
        &self,
        _input: &Value,
        _ctx: &InvocationContext,
        _state: &mut ProcessState,
    ) -> String {
        match leak_file_stream(&self.leak_file) {
            Ok(()) => info!("Leaked file stream on {}", self.leak_file.display()),
            Err(e) => error!("Error creating leaked file stream: {}", e),
        }

        info!(
            "Lambda function is about to sleep for {} seconds (exceeding {}s timeout)...",
            self.sleep.as_secs_f64(),
            self.assumed_budget.as_secs_f64()
        );

        // The context's remaining time is deliberately not consulted.
        if let SleepOutcome::Interrupted { remaining } = sleep_unconditionally(self.sleep) {
            warn!("Thread was interrupted with {:?} of sleep remaining", remaining);
        }

        UNREACHABLE_RESPONSE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn call(handler: &TimeoutHandler) -> String {
        handler.handle(
            &Value::Null,
            &InvocationContext::default(),
            &mut ProcessState::new(),
        )
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "lambda_probe_timeout_{}_{}.txt",
            name,
            uuid::Uuid::new_v4()
        ))
    }

    #[test]
    fn test_direct_call_returns_constant() {
        let path = scratch_path("direct");
        let handler =
            TimeoutHandler::new(&path, Duration::from_millis(50), Duration::from_millis(10));

        let start = Instant::now();
        let response = call(&handler);

        assert_eq!(response, UNREACHABLE_RESPONSE);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), LEAKED_CONTENT);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_sleep_ignores_remaining_budget() {
        let path = scratch_path("budget");
        let handler =
            TimeoutHandler::new(&path, Duration::from_millis(80), Duration::from_millis(10));
        let ctx = InvocationContext::with_budget("req", Duration::from_millis(1));

        let start = Instant::now();
        handler.handle(&Value::Null, &ctx, &mut ProcessState::new());

        assert!(start.elapsed() >= Duration::from_millis(80));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_unwritable_leak_path_is_not_fatal() {
        let handler = TimeoutHandler::new(
            "/nonexistent/lambda-probe/leaked_file.txt",
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        assert_eq!(call(&handler), UNREACHABLE_RESPONSE);
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupted_sleep_still_returns_constant() {
        let path = scratch_path("interrupted");
        let handler =
            TimeoutHandler::new(&path, Duration::from_secs(10), Duration::from_millis(10));

        let start = Instant::now();
        let response = crate::utils::sleep::interrupt_until_done(move || call(&handler));

        assert_eq!(response, UNREACHABLE_RESPONSE);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), LEAKED_CONTENT);
        let _ = std::fs::remove_file(path);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_handle_stays_open_after_return() {
        let path = scratch_path("held");
        let handler =
            TimeoutHandler::new(&path, Duration::from_millis(1), Duration::from_millis(1));
        call(&handler);

        let held = crate::utils::fd_census::fds_pointing_at(&path).unwrap();
        assert_eq!(held.len(), 1);
    }
}
