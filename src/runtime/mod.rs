//! Runtime
//!
//! Process-lifetime state and the local host that owns it and drives handlers.

pub mod host;
pub mod state;

pub use host::{Host, InvocationOutcome};
pub use state::{LeakCounts, ProcessState};
