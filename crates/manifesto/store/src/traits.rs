use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use manifesto_types::{
    ActorAuthorityBinding, ActorId, DecisionId, DecisionRecord, EdgeId, Proposal, ProposalId,
    ProposalStatus, Snapshot, World, WorldEdge, WorldId,
};

use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Query filter for proposals with `limit`/`offset` pagination.
#[derive(Clone, Debug, Default)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub actor: Option<ActorId>,
    pub base_world: Option<WorldId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ProposalFilter {
    pub fn status(mut self, status: ProposalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn base_world(mut self, world: WorldId) -> Self {
        self.base_world = Some(world);
        self
    }

    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }

    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Whether a proposal satisfies every set predicate (pagination aside).
    pub fn matches(&self, proposal: &Proposal) -> bool {
        if let Some(status) = self.status {
            if proposal.status != status {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &proposal.actor != actor {
                return false;
            }
        }
        if let Some(base) = &self.base_world {
            if &proposal.base_world != base {
                return false;
            }
        }
        if let Some(since) = self.since {
            if proposal.submitted_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if proposal.submitted_at > until {
                return false;
            }
        }
        true
    }
}

/// Entity counts across the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub worlds: usize,
    pub edges: usize,
    pub proposals: usize,
    pub decisions: usize,
    pub bindings: usize,
    pub snapshots: usize,
}

/// Persistence port for the world protocol.
///
/// Immutable entities (worlds, edges, decisions) may be saved exactly once;
/// a second save with the same id fails with `AlreadyExists`. Proposals and
/// bindings are mutable and support update/removal. Snapshots are owned by
/// the store, keyed 1:1 by world id, and upserted (re-persisting the same
/// content is a no-op merge).
#[async_trait]
pub trait WorldStore: Send + Sync {
    // --- Worlds (immutable) ---
    async fn save_world(&self, world: World) -> StoreResult<()>;
    async fn get_world(&self, id: &WorldId) -> StoreResult<Option<World>>;
    async fn list_worlds(&self) -> StoreResult<Vec<World>>;

    // --- Snapshots (store-owned, keyed by world) ---
    async fn save_snapshot(&self, world: &WorldId, snapshot: Snapshot) -> StoreResult<()>;
    async fn get_snapshot(&self, world: &WorldId) -> StoreResult<Option<Snapshot>>;

    // --- Edges (immutable) ---
    async fn save_edge(&self, edge: WorldEdge) -> StoreResult<()>;
    async fn get_edge(&self, id: &EdgeId) -> StoreResult<Option<WorldEdge>>;
    async fn list_edges_from(&self, world: &WorldId) -> StoreResult<Vec<WorldEdge>>;

    // --- Proposals (mutable) ---
    async fn save_proposal(&self, proposal: Proposal) -> StoreResult<()>;
    async fn update_proposal(&self, proposal: Proposal) -> StoreResult<()>;
    async fn delete_proposal(&self, id: &ProposalId) -> StoreResult<bool>;
    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<Proposal>>;
    async fn list_proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>>;

    // --- Decisions (immutable) ---
    async fn save_decision(&self, decision: DecisionRecord) -> StoreResult<()>;
    async fn get_decision(&self, id: &DecisionId) -> StoreResult<Option<DecisionRecord>>;
    async fn list_decisions_for(&self, proposal: &ProposalId) -> StoreResult<Vec<DecisionRecord>>;

    // --- Bindings (mutable, keyed by actor) ---
    async fn save_binding(&self, binding: ActorAuthorityBinding) -> StoreResult<()>;
    async fn get_binding(&self, actor: &ActorId) -> StoreResult<Option<ActorAuthorityBinding>>;
    async fn remove_binding(&self, actor: &ActorId) -> StoreResult<bool>;
    async fn list_bindings(&self) -> StoreResult<Vec<ActorAuthorityBinding>>;

    // --- Genesis marker ---
    /// May be called at most once, and only for an already-saved world.
    async fn set_genesis(&self, world: &WorldId) -> StoreResult<()>;
    async fn get_genesis(&self) -> StoreResult<Option<WorldId>>;

    async fn get_stats(&self) -> StoreResult<StoreStats>;
}
