use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authority::AuthorityRef;
use crate::decision::Ruling;
use crate::ids::{ActorId, DecisionId, ProposalId, WorldId};

/// Discriminant for the closed governance event set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEventKind {
    WorldCreated,
    WorldForked,
    ProposalSubmitted,
    ProposalEvaluating,
    ProposalDecided,
    ProposalSuperseded,
    ExecutionCompleted,
    ExecutionFailed,
}

impl WorldEventKind {
    /// Wire name of the event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorldCreated => "world:created",
            Self::WorldForked => "world:forked",
            Self::ProposalSubmitted => "proposal:submitted",
            Self::ProposalEvaluating => "proposal:evaluating",
            Self::ProposalDecided => "proposal:decided",
            Self::ProposalSuperseded => "proposal:superseded",
            Self::ExecutionCompleted => "execution:completed",
            Self::ExecutionFailed => "execution:failed",
        }
    }
}

impl std::fmt::Display for WorldEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a proposal was dropped before evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupersededReason {
    BranchSwitch,
}

/// How an execution terminated, as derived from the terminal snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionDisposition {
    Completed,
    Failed,
}

/// Governance events emitted by the orchestrator. Within one proposal's
/// lifecycle events arrive in strict causal order; across proposals no
/// ordering is guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    WorldCreated {
        world: WorldId,
        /// Parent world, `None` for genesis.
        from: Option<WorldId>,
        proposal: Option<ProposalId>,
        outcome: Option<ExecutionDisposition>,
        timestamp: DateTime<Utc>,
    },
    WorldForked {
        base: WorldId,
        world: WorldId,
        proposal: ProposalId,
        timestamp: DateTime<Utc>,
    },
    ProposalSubmitted {
        proposal: ProposalId,
        actor: ActorId,
        base_world: WorldId,
        timestamp: DateTime<Utc>,
    },
    ProposalEvaluating {
        proposal: ProposalId,
        authority: AuthorityRef,
        timestamp: DateTime<Utc>,
    },
    ProposalDecided {
        proposal: ProposalId,
        decision: DecisionId,
        ruling: Ruling,
        timestamp: DateTime<Utc>,
    },
    ProposalSuperseded {
        proposal: ProposalId,
        reason: SupersededReason,
        epoch: u64,
        timestamp: DateTime<Utc>,
    },
    ExecutionCompleted {
        proposal: ProposalId,
        world: WorldId,
        timestamp: DateTime<Utc>,
    },
    ExecutionFailed {
        proposal: ProposalId,
        world: WorldId,
        summary: String,
        timestamp: DateTime<Utc>,
    },
}

impl WorldEvent {
    pub fn kind(&self) -> WorldEventKind {
        match self {
            Self::WorldCreated { .. } => WorldEventKind::WorldCreated,
            Self::WorldForked { .. } => WorldEventKind::WorldForked,
            Self::ProposalSubmitted { .. } => WorldEventKind::ProposalSubmitted,
            Self::ProposalEvaluating { .. } => WorldEventKind::ProposalEvaluating,
            Self::ProposalDecided { .. } => WorldEventKind::ProposalDecided,
            Self::ProposalSuperseded { .. } => WorldEventKind::ProposalSuperseded,
            Self::ExecutionCompleted { .. } => WorldEventKind::ExecutionCompleted,
            Self::ExecutionFailed { .. } => WorldEventKind::ExecutionFailed,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::WorldCreated { timestamp, .. }
            | Self::WorldForked { timestamp, .. }
            | Self::ProposalSubmitted { timestamp, .. }
            | Self::ProposalEvaluating { timestamp, .. }
            | Self::ProposalDecided { timestamp, .. }
            | Self::ProposalSuperseded { timestamp, .. }
            | Self::ExecutionCompleted { timestamp, .. }
            | Self::ExecutionFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Proposal this event correlates to, when any.
    pub fn proposal(&self) -> Option<&ProposalId> {
        match self {
            Self::WorldCreated { proposal, .. } => proposal.as_ref(),
            Self::WorldForked { proposal, .. }
            | Self::ProposalSubmitted { proposal, .. }
            | Self::ProposalEvaluating { proposal, .. }
            | Self::ProposalDecided { proposal, .. }
            | Self::ProposalSuperseded { proposal, .. }
            | Self::ExecutionCompleted { proposal, .. }
            | Self::ExecutionFailed { proposal, .. } => Some(proposal),
        }
    }
}
