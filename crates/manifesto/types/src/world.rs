use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DecisionId, EdgeId, ProposalId, WorldId};
use crate::snapshot::Snapshot;

/// Immutable, content-addressed state snapshot plus provenance.
///
/// The same `(schema_hash, snapshot)` pair always yields the same `world_id`,
/// so worlds are deduplicated and never overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub world_id: WorldId,
    pub schema_hash: String,
    pub snapshot_hash: String,
    pub created_at: DateTime<Utc>,
    /// Originating proposal, `None` for genesis.
    pub created_by: Option<ProposalId>,
}

impl World {
    /// Derive the world record for a snapshot under a schema.
    pub fn derive(
        schema_hash: impl Into<String>,
        snapshot: &Snapshot,
        created_by: Option<ProposalId>,
    ) -> Self {
        let schema_hash = schema_hash.into();
        let snapshot_hash = snapshot.content_hash();
        let world_id = WorldId::derive(&schema_hash, &snapshot_hash);
        Self {
            world_id,
            schema_hash,
            snapshot_hash,
            created_at: Utc::now(),
            created_by,
        }
    }
}

/// Immutable causal link between two worlds. `from` is the pre-state,
/// `to` the post-state; created exactly once per successful transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEdge {
    pub edge_id: EdgeId,
    pub from: WorldId,
    pub to: WorldId,
    pub proposal_id: ProposalId,
    pub decision_id: DecisionId,
    pub created_at: DateTime<Utc>,
}

impl WorldEdge {
    pub fn new(from: WorldId, to: WorldId, proposal_id: ProposalId, decision_id: DecisionId) -> Self {
        Self {
            edge_id: EdgeId::new(),
            from,
            to,
            proposal_id,
            decision_id,
            created_at: Utc::now(),
        }
    }
}
