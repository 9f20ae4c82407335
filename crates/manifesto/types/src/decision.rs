use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::authority::AuthorityRef;
use crate::ids::{DecisionId, ProposalId};

/// An authority's verdict on a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ruling {
    Approved,
    Rejected,
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Immutable record of an authority decision. At most one per proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: DecisionId,
    pub proposal_id: ProposalId,
    pub authority: AuthorityRef,
    pub ruling: Ruling,
    #[serde(default)]
    pub reason: Option<String>,
    /// Scope the execution runs under; `None` means unrestricted.
    #[serde(default)]
    pub approved_scope: Option<Value>,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        proposal_id: ProposalId,
        authority: AuthorityRef,
        ruling: Ruling,
        reason: Option<String>,
        approved_scope: Option<Value>,
    ) -> Self {
        Self {
            decision_id: DecisionId::new(),
            proposal_id,
            authority,
            ruling,
            reason,
            approved_scope,
            decided_at: Utc::now(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.ruling == Ruling::Approved
    }
}
