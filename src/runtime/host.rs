/// Local host: the process-lifecycle wrapper around a handler
///
/// Owns the single `ProcessState` for as long as the host lives, mints an
/// invocation context per call, and optionally enforces a wall-time budget the
/// way a function platform would: the caller stops waiting once the budget is
/// spent, whatever the handler is doing.
use crate::config::types::{InvocationContext, ProbeError, Result};
use crate::handler::Handler;
use crate::runtime::state::ProcessState;
use crossbeam_channel::RecvTimeoutError;
use log::{debug, error, info};
use serde::Serialize;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// What the caller observed for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Completed {
        request_id: String,
        response: String,
        elapsed_ms: u64,
    },
    /// The budget ran out before the handler returned
    TimedOut {
        request_id: String,
        budget_ms: u64,
    },
    /// The handler panicked
    Failed { request_id: String, error: String },
}

impl InvocationOutcome {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Completed { request_id, .. }
            | Self::TimedOut { request_id, .. }
            | Self::Failed { request_id, .. } => request_id,
        }
    }

    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Completed { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

pub struct Host {
    handler: Arc<dyn Handler>,
    // Locked for the duration of each call. A timed host runs the handler on
    // a worker thread, so the state has to cross threads.
    state: Arc<Mutex<ProcessState>>,
    budget: Option<Duration>,
}

impl Host {
    /// Host with a fresh process state and no budget
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            state: Arc::new(Mutex::new(ProcessState::new())),
            budget: None,
        }
    }

    /// Enforce `budget` on every invocation
    pub fn with_budget(mut self, budget: Duration) -> Result<Self> {
        if budget.is_zero() {
            return Err(ProbeError::Host("execution budget must be non-zero".to_string()));
        }
        self.budget = Some(budget);
        Ok(self)
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Run `f` against the process state
    ///
    /// Blocks while an invocation, including an abandoned timed-out one, holds
    /// the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&ProcessState) -> R) -> R {
        let guard = lock_state(&self.state);
        f(&*guard)
    }

    /// Invoke the handler once
    pub fn invoke(&self, input: Value) -> InvocationOutcome {
        let request_id = Uuid::new_v4().to_string();
        let ctx = match self.budget {
            Some(budget) => InvocationContext::with_budget(request_id.clone(), budget),
            None => InvocationContext::new(request_id.clone(), 0),
        };

        info!(
            "START RequestId: {} fixture={}",
            request_id,
            self.handler.kind()
        );
        let start = Instant::now();

        let outcome = match self.budget {
            None => {
                let result = run_guarded(self.handler.as_ref(), &input, &ctx, &self.state);
                complete(request_id, result, start)
            }
            Some(budget) => self.invoke_timed(input, ctx, budget, start),
        };

        info!(
            "END RequestId: {} elapsed={}ms",
            outcome.request_id(),
            start.elapsed().as_millis()
        );
        outcome
    }

    fn invoke_timed(
        &self,
        input: Value,
        ctx: InvocationContext,
        budget: Duration,
        start: Instant,
    ) -> InvocationOutcome {
        let request_id = ctx.request_id.clone();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let handler = Arc::clone(&self.handler);
        let state = Arc::clone(&self.state);

        let spawned = thread::Builder::new()
            .name(format!("invocation-{}", request_id))
            .spawn(move || {
                let result = run_guarded(handler.as_ref(), &input, &ctx, &state);
                // The receiver is gone when the invocation already timed out.
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            error!("Failed to spawn invocation worker: {}", e);
            return InvocationOutcome::Failed {
                request_id,
                error: format!("failed to spawn invocation worker: {}", e),
            };
        }

        match rx.recv_timeout(budget) {
            Ok(result) => complete(request_id, result, start),
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    "{} Task timed out after {:.2} seconds",
                    request_id,
                    budget.as_secs_f64()
                );
                // The worker is abandoned, not killed; it keeps the state
                // locked until the handler eventually returns.
                InvocationOutcome::TimedOut {
                    request_id,
                    budget_ms: budget.as_millis() as u64,
                }
            }
            Err(RecvTimeoutError::Disconnected) => InvocationOutcome::Failed {
                request_id,
                error: "invocation worker exited without a response".to_string(),
            },
        }
    }
}

fn lock_state(state: &Mutex<ProcessState>) -> MutexGuard<'_, ProcessState> {
    // Poisoning only means an earlier holder panicked; the state is still usable.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_guarded(
    handler: &dyn Handler,
    input: &Value,
    ctx: &InvocationContext,
    state: &Mutex<ProcessState>,
) -> std::result::Result<String, String> {
    let mut guard = lock_state(state);
    panic::catch_unwind(AssertUnwindSafe(|| handler.handle(input, ctx, &mut *guard)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn complete(
    request_id: String,
    result: std::result::Result<String, String>,
    start: Instant,
) -> InvocationOutcome {
    match result {
        Ok(response) => {
            debug!("{} response: {}", request_id, response);
            InvocationOutcome::Completed {
                request_id,
                response,
                elapsed_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(error) => {
            error!("{} handler failed: {}", request_id, error);
            InvocationOutcome::Failed { request_id, error }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::FixtureKind;

    struct Panicking;

    impl Handler for Panicking {
        fn kind(&self) -> FixtureKind {
            FixtureKind::Greeting
        }

        fn handle(&self, _: &Value, _: &InvocationContext, state: &mut ProcessState) -> String {
            state.begin_invocation();
            panic!("boom");
        }
    }

    struct EchoRemaining;

    impl Handler for EchoRemaining {
        fn kind(&self) -> FixtureKind {
            FixtureKind::Greeting
        }

        fn handle(&self, _: &Value, ctx: &InvocationContext, _: &mut ProcessState) -> String {
            format!("{}|{}", ctx.request_id, ctx.remaining_time_ms)
        }
    }

    #[test]
    fn test_zero_budget_rejected() {
        let result = Host::new(Arc::new(EchoRemaining)).with_budget(Duration::ZERO);
        assert!(matches!(result, Err(ProbeError::Host(_))));
    }

    #[test]
    fn test_context_minted_per_call() {
        let host = Host::new(Arc::new(EchoRemaining))
            .with_budget(Duration::from_secs(3))
            .unwrap();

        assert_eq!(host.budget(), Some(Duration::from_secs(3)));

        let first = host.invoke(Value::Null);
        let second = host.invoke(Value::Null);

        assert_ne!(first.request_id(), second.request_id());
        assert_eq!(
            first.response().unwrap(),
            format!("{}|3000", first.request_id())
        );
    }

    #[test]
    fn test_panic_reported_and_state_survives() {
        let host = Host::new(Arc::new(Panicking));

        match host.invoke(Value::Null) {
            InvocationOutcome::Failed { error, .. } => assert_eq!(error, "boom"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        // The increment made before the panic stays.
        assert_eq!(host.with_state(|s| s.invocations()), 1);
    }

    #[test]
    fn test_panic_reported_on_timed_host() {
        let host = Host::new(Arc::new(Panicking))
            .with_budget(Duration::from_secs(5))
            .unwrap();
        assert!(matches!(
            host.invoke(Value::Null),
            InvocationOutcome::Failed { .. }
        ));
    }
}
