use crate::config::types::{FixtureKind, InvocationContext};
use crate::handler::Handler;
use crate::runtime::state::ProcessState;
use serde_json::Value;

/// Returns `"Hello, " + input`
///
/// A JSON null renders as `null`, strings render without quotes, anything
/// else renders as its JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreetingHandler;

impl GreetingHandler {
    pub fn greet(input: &Value) -> String {
        match input {
            Value::String(s) => format!("Hello, {}", s),
            other => format!("Hello, {}", other),
        }
    }
}

impl Handler for GreetingHandler {
    fn kind(&self) -> FixtureKind {
        FixtureKind::Greeting
    }

    fn handle(&self, input: &Value, _ctx: &InvocationContext, _state: &mut ProcessState) -> String {
        Self::greet(input)
    }
}
