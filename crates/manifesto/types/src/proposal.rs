use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ActorId, DecisionId, ProposalId, WorldId};
use crate::intent::IntentInstance;

/// Lifecycle position of a proposal. Status only ever moves forward:
/// `submitted → evaluating → {approved, rejected} → executing →
/// {completed, failed}`, with `rejected` terminal and `approved` terminal
/// when no executor is configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Submitted,
    Evaluating,
    Approved,
    Rejected,
    Executing,
    Completed,
    Failed,
}

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Failed)
    }

    /// Legal forward movement in the state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Evaluating)
                | (Self::Evaluating, Self::Approved)
                | (Self::Evaluating, Self::Rejected)
                | (Self::Approved, Self::Executing)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::Failed)
        )
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Submitted => "submitted",
            Self::Evaluating => "evaluating",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// A request by an actor to transition from a base world via an intent.
/// Mutable during its lifecycle only through status transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: ProposalId,
    /// Derived once from the key policy; stable across retries.
    pub execution_key: String,
    pub actor: ActorId,
    pub intent: IntentInstance,
    pub base_world: WorldId,
    /// Epoch captured at submission, used for staleness classification.
    pub epoch: u64,
    pub status: ProposalStatus,
    #[serde(default)]
    pub decision_id: Option<DecisionId>,
    /// Resolved scope carried from the decision; `None` means unrestricted.
    #[serde(default)]
    pub approved_scope: Option<Value>,
    #[serde(default)]
    pub result_world: Option<WorldId>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Proposal {
    pub fn new(
        proposal_id: ProposalId,
        execution_key: String,
        actor: ActorId,
        intent: IntentInstance,
        base_world: WorldId,
        epoch: u64,
    ) -> Self {
        Self {
            proposal_id,
            execution_key,
            actor,
            intent,
            base_world,
            epoch,
            status: ProposalStatus::Submitted,
            decision_id: None,
            approved_scope: None,
            result_world: None,
            submitted_at: Utc::now(),
            decided_at: None,
            completed_at: None,
        }
    }
}
