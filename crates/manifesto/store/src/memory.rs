use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

use manifesto_types::{
    ActorAuthorityBinding, ActorId, DecisionId, DecisionRecord, EdgeId, Proposal, ProposalId,
    Snapshot, World, WorldEdge, WorldEvent, WorldEventKind, WorldId,
};

use crate::error::StoreError;
use crate::observable::{EventListener, ListenerId, ListenerTable, ObservableWorldStore};
use crate::traits::{ProposalFilter, StoreResult, StoreStats, WorldStore};

/// In-memory reference store used for tests, local demos, and embedding.
pub struct InMemoryWorldStore {
    inner: RwLock<StoreState>,
    // Listener dispatch is synchronous; a std mutex keeps subscribe/publish
    // usable outside async contexts.
    listeners: Mutex<ListenerTable>,
}

#[derive(Default)]
struct StoreState {
    worlds: HashMap<WorldId, World>,
    snapshots: HashMap<WorldId, Snapshot>,
    edges: HashMap<EdgeId, WorldEdge>,
    proposals: HashMap<ProposalId, Proposal>,
    decisions: HashMap<DecisionId, DecisionRecord>,
    bindings: HashMap<ActorId, ActorAuthorityBinding>,
    genesis: Option<WorldId>,
}

impl InMemoryWorldStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
            listeners: Mutex::new(ListenerTable::default()),
        }
    }
}

impl Default for InMemoryWorldStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorldStore for InMemoryWorldStore {
    async fn save_world(&self, world: World) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        if state.worlds.contains_key(&world.world_id) {
            return Err(StoreError::already_exists("world", &world.world_id));
        }
        state.worlds.insert(world.world_id.clone(), world);
        Ok(())
    }

    async fn get_world(&self, id: &WorldId) -> StoreResult<Option<World>> {
        Ok(self.inner.read().await.worlds.get(id).cloned())
    }

    async fn list_worlds(&self) -> StoreResult<Vec<World>> {
        let state = self.inner.read().await;
        let mut worlds: Vec<World> = state.worlds.values().cloned().collect();
        worlds.sort_by_key(|w| (w.created_at, w.world_id.clone()));
        Ok(worlds)
    }

    async fn save_snapshot(&self, world: &WorldId, snapshot: Snapshot) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        state.snapshots.insert(world.clone(), snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, world: &WorldId) -> StoreResult<Option<Snapshot>> {
        Ok(self.inner.read().await.snapshots.get(world).cloned())
    }

    async fn save_edge(&self, edge: WorldEdge) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        if state.edges.contains_key(&edge.edge_id) {
            return Err(StoreError::already_exists("edge", &edge.edge_id));
        }
        state.edges.insert(edge.edge_id.clone(), edge);
        Ok(())
    }

    async fn get_edge(&self, id: &EdgeId) -> StoreResult<Option<WorldEdge>> {
        Ok(self.inner.read().await.edges.get(id).cloned())
    }

    async fn list_edges_from(&self, world: &WorldId) -> StoreResult<Vec<WorldEdge>> {
        let state = self.inner.read().await;
        let mut edges: Vec<WorldEdge> = state
            .edges
            .values()
            .filter(|edge| &edge.from == world)
            .cloned()
            .collect();
        edges.sort_by_key(|edge| edge.created_at);
        Ok(edges)
    }

    async fn save_proposal(&self, proposal: Proposal) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        if state.proposals.contains_key(&proposal.proposal_id) {
            return Err(StoreError::already_exists("proposal", &proposal.proposal_id));
        }
        state.proposals.insert(proposal.proposal_id.clone(), proposal);
        Ok(())
    }

    async fn update_proposal(&self, proposal: Proposal) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        if !state.proposals.contains_key(&proposal.proposal_id) {
            return Err(StoreError::not_found("proposal", &proposal.proposal_id));
        }
        state.proposals.insert(proposal.proposal_id.clone(), proposal);
        Ok(())
    }

    async fn delete_proposal(&self, id: &ProposalId) -> StoreResult<bool> {
        let mut state = self.inner.write().await;
        Ok(state.proposals.remove(id).is_some())
    }

    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<Proposal>> {
        Ok(self.inner.read().await.proposals.get(id).cloned())
    }

    async fn list_proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let state = self.inner.read().await;
        let mut proposals: Vec<Proposal> = state
            .proposals
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        proposals.sort_by_key(|p| (p.submitted_at, p.proposal_id.clone().0));
        let page: Vec<Proposal> = proposals
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(page)
    }

    async fn save_decision(&self, decision: DecisionRecord) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        if state.decisions.contains_key(&decision.decision_id) {
            return Err(StoreError::already_exists("decision", &decision.decision_id));
        }
        state.decisions.insert(decision.decision_id.clone(), decision);
        Ok(())
    }

    async fn get_decision(&self, id: &DecisionId) -> StoreResult<Option<DecisionRecord>> {
        Ok(self.inner.read().await.decisions.get(id).cloned())
    }

    async fn list_decisions_for(&self, proposal: &ProposalId) -> StoreResult<Vec<DecisionRecord>> {
        let state = self.inner.read().await;
        let mut decisions: Vec<DecisionRecord> = state
            .decisions
            .values()
            .filter(|d| &d.proposal_id == proposal)
            .cloned()
            .collect();
        decisions.sort_by_key(|d| d.decided_at);
        Ok(decisions)
    }

    async fn save_binding(&self, binding: ActorAuthorityBinding) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        state.bindings.insert(binding.actor.clone(), binding);
        Ok(())
    }

    async fn get_binding(&self, actor: &ActorId) -> StoreResult<Option<ActorAuthorityBinding>> {
        Ok(self.inner.read().await.bindings.get(actor).cloned())
    }

    async fn remove_binding(&self, actor: &ActorId) -> StoreResult<bool> {
        let mut state = self.inner.write().await;
        Ok(state.bindings.remove(actor).is_some())
    }

    async fn list_bindings(&self) -> StoreResult<Vec<ActorAuthorityBinding>> {
        let state = self.inner.read().await;
        let mut bindings: Vec<ActorAuthorityBinding> = state.bindings.values().cloned().collect();
        bindings.sort_by_key(|b| b.actor.clone());
        Ok(bindings)
    }

    async fn set_genesis(&self, world: &WorldId) -> StoreResult<()> {
        let mut state = self.inner.write().await;
        if state.genesis.is_some() {
            return Err(StoreError::GenesisAlreadySet);
        }
        if !state.worlds.contains_key(world) {
            return Err(StoreError::GenesisWorldMissing {
                id: world.to_string(),
            });
        }
        state.genesis = Some(world.clone());
        Ok(())
    }

    async fn get_genesis(&self) -> StoreResult<Option<WorldId>> {
        Ok(self.inner.read().await.genesis.clone())
    }

    async fn get_stats(&self) -> StoreResult<StoreStats> {
        let state = self.inner.read().await;
        Ok(StoreStats {
            worlds: state.worlds.len(),
            edges: state.edges.len(),
            proposals: state.proposals.len(),
            decisions: state.decisions.len(),
            bindings: state.bindings.len(),
            snapshots: state.snapshots.len(),
        })
    }
}

impl ObservableWorldStore for InMemoryWorldStore {
    fn subscribe(&self, kind: WorldEventKind, listener: EventListener) -> ListenerId {
        self.listeners
            .lock()
            .expect("listener table mutex poisoned")
            .subscribe(kind, listener)
    }

    fn subscribe_all(&self, listener: EventListener) -> ListenerId {
        self.listeners
            .lock()
            .expect("listener table mutex poisoned")
            .subscribe_all(listener)
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .expect("listener table mutex poisoned")
            .unsubscribe(id)
    }

    fn publish(&self, event: &WorldEvent) {
        self.listeners
            .lock()
            .expect("listener table mutex poisoned")
            .dispatch(event);
    }
}
