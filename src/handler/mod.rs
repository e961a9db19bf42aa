//! Handlers
//!
//! The fixtures a host can run. They are independent of each other: each one
//! reproduces a single iteration of the probe and none of them assumes the
//! others' contract.
//!
//! - [`greeting`]: canned `"Hello, <input>"` response
//! - [`timeout`]: leaks one handle, then sleeps through the execution budget
//! - [`reuse`]: accumulates leaks in the process state and writes evidence
//!
//! No handler returns an error. Every failure inside a call is logged where it
//! happens and the call carries on.

pub mod greeting;
pub mod reuse;
pub mod timeout;

use crate::config::config::ProbeConfig;
use crate::config::types::{FixtureKind, InvocationContext};
use crate::runtime::state::ProcessState;
use serde_json::Value;
use std::sync::Arc;

pub use greeting::GreetingHandler;
pub use reuse::{InvocationReport, ReuseHandler};
pub use timeout::TimeoutHandler;

/// A request handler invoked by the host once per call
///
/// `state` is the single process-wide instance owned by the host. Handlers
/// that have no use for it simply ignore it.
pub trait Handler: Send + Sync {
    fn kind(&self) -> FixtureKind;

    fn handle(&self, input: &Value, ctx: &InvocationContext, state: &mut ProcessState) -> String;
}

/// Build the handler for `kind` from the fixture paths in `config`
pub fn build(kind: FixtureKind, config: &ProbeConfig) -> Arc<dyn Handler> {
    match kind {
        FixtureKind::Greeting => Arc::new(GreetingHandler),
        FixtureKind::Timeout => Arc::new(TimeoutHandler::from_config(config)),
        FixtureKind::Reuse => Arc::new(ReuseHandler::from_config(config)),
    }
}
