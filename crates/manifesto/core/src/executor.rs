use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use manifesto_types::{ActorId, IntentInstance, ProposalId, Snapshot, WorldId};

/// Infrastructure failure inside the executor itself, as opposed to a
/// domain failure reflected in the terminal snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutorFailure(pub String);

/// Execution context handed to the executor alongside the intent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Scope the decision granted; `None` means unrestricted.
    pub approved_scope: Option<Value>,
}

/// What the executor returned. The orchestrator derives the outcome from
/// the terminal snapshot alone; `error` is advisory and never trusted for
/// outcome derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRun {
    pub terminal_snapshot: Snapshot,
    pub trace_ref: Option<String>,
    pub error: Option<String>,
}

impl ExecutionRun {
    pub fn new(terminal_snapshot: Snapshot) -> Self {
        Self {
            terminal_snapshot,
            trace_ref: None,
            error: None,
        }
    }
}

/// Port to the deterministic state-computation engine. Must be
/// deterministic given identical inputs and must never mutate the base
/// snapshot.
#[async_trait]
pub trait HostExecutor: Send + Sync {
    async fn execute(
        &self,
        execution_key: &str,
        base_snapshot: &Snapshot,
        intent: &IntentInstance,
        context: &ExecutionContext,
    ) -> Result<ExecutionRun, ExecutorFailure>;
}

/// Derives the execution key fixed for all retries of one proposal.
pub trait ExecutionKeyPolicy: Send + Sync {
    fn derive(
        &self,
        proposal: &ProposalId,
        actor: &ActorId,
        base_world: &WorldId,
        attempt: u32,
    ) -> String;
}

/// Default policy: `"<proposal>:1"`.
pub struct DefaultKeyPolicy;

impl ExecutionKeyPolicy for DefaultKeyPolicy {
    fn derive(
        &self,
        proposal: &ProposalId,
        _actor: &ActorId,
        _base_world: &WorldId,
        attempt: u32,
    ) -> String {
        format!("{proposal}:{attempt}")
    }
}
