/// Core types shared by the probe handlers, host and CLI
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Per-call metadata supplied by the host
///
/// Handlers only read it. Neither field ever drives control flow: the request
/// id is for display and the remaining time is reported, never obeyed.
#[derive(Clone, Debug, Default)]
pub struct InvocationContext {
    /// Request identifier minted by the host
    pub request_id: String,
    /// Remaining execution budget in milliseconds when the context was minted
    pub remaining_time_ms: u64,
    /// Deadline the remaining budget counts down to (None for untimed hosts)
    deadline: Option<Instant>,
}

impl InvocationContext {
    /// Create a context with a fixed remaining budget and no deadline
    pub fn new(request_id: impl Into<String>, remaining_time_ms: u64) -> Self {
        Self {
            request_id: request_id.into(),
            remaining_time_ms,
            deadline: None,
        }
    }

    /// Create a context whose remaining time counts down to `now + budget`
    pub fn with_budget(request_id: impl Into<String>, budget: Duration) -> Self {
        Self {
            request_id: request_id.into(),
            remaining_time_ms: budget.as_millis() as u64,
            deadline: Some(Instant::now() + budget),
        }
    }

    /// Remaining milliseconds right now
    ///
    /// Falls back to the minted value when the host did not set a deadline.
    pub fn remaining_time_ms(&self) -> u64 {
        match self.deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .as_millis() as u64,
            None => self.remaining_time_ms,
        }
    }
}

/// Which fixture a host runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    /// `"Hello, " + input`
    Greeting,
    /// Leak one handle, then sleep past the budget
    Timeout,
    /// Accumulate leaks and write reuse evidence
    Reuse,
}

impl FixtureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Timeout => "timeout",
            Self::Reuse => "reuse",
        }
    }
}

impl std::str::FromStr for FixtureKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greeting" | "hello" => Ok(Self::Greeting),
            "timeout" | "a" => Ok(Self::Timeout),
            "reuse" | "b" => Ok(Self::Reuse),
            other => Err(ProbeError::Config(format!("Unknown fixture: {}", other))),
        }
    }
}

impl std::fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors surfaced by the crate-level APIs
///
/// Handlers never return these: inside a handler every failure is logged and
/// swallowed at its origin.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Evidence error: {0}")]
    Evidence(String),

    #[error("Host error: {0}")]
    Host(String),
}
