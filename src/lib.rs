//! lambda-probe: a cloud-function diagnostic fixture
//! Leaks handles and memory on purpose, sleeps through its execution budget,
//! and leaves evidence files behind, to show whether a function host reuses
//! process state between invocations.
//!
//! # Architecture
//!
//! ## Handlers ([`handler`])
//! - [`handler::greeting`]: canned `"Hello, <input>"` fixture
//! - [`handler::timeout`]: leaks one file handle, then sleeps past the budget
//! - [`handler::reuse`]: accumulates leaks across calls and writes evidence
//!
//! ## Runtime ([`runtime`])
//! - [`runtime::state`]: process-lifetime diagnostic state
//! - [`runtime::host`]: local host that owns the state and enforces a budget
//!
//! ## Evidence ([`evidence`])
//! - [`evidence::record`]: the per-invocation evidence line
//! - [`evidence::store`]: best-effort append and read-back over candidate paths
//!
//! ## Configuration ([`config`])
//! - [`config::config`]: fixture paths and sizes, loaded from probe.json
//! - [`config::types`]: invocation context, fixture kinds, error taxonomy
//!
//! ## Utilities ([`utils`])
//! - [`utils::fd_census`]: open descriptor census via /proc/self/fd
//! - [`utils::sleep`]: signal-interruptible, deadline-blind sleep
//!
//! Nothing inside a handler is fatal. Every I/O failure is logged where it
//! happens and the call continues.

// Configuration
pub mod config;

// Handlers
pub mod handler;

// Process state and host
pub mod runtime;

// Evidence records and files
pub mod evidence;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the probe binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::config::ProbeConfig;
pub use config::types::*;
pub use handler::Handler;
pub use runtime::{Host, InvocationOutcome, ProcessState};
