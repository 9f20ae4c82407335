use std::collections::HashMap;
use std::sync::RwLock;

use manifesto_types::{DecisionId, EdgeId, ProposalId, World, WorldEdge, WorldId};

use crate::error::ProtocolError;

/// In-memory DAG of worlds connected by immutable edges.
///
/// Realized as an arena of world records with explicit parent/children
/// index maps; edges only ever point from an existing world to a newly
/// minted one, so the graph is acyclic by construction. World and edge are
/// inserted under one write lock, so readers never observe partial state.
pub struct WorldLineage {
    inner: RwLock<LineageState>,
}

#[derive(Default)]
struct LineageState {
    worlds: HashMap<WorldId, World>,
    edges: HashMap<EdgeId, WorldEdge>,
    /// At most one parent edge per world.
    parent_edge: HashMap<WorldId, EdgeId>,
    children: HashMap<WorldId, Vec<EdgeId>>,
    genesis: Option<WorldId>,
}

impl WorldLineage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LineageState::default()),
        }
    }

    /// Seed the lineage with the genesis world. Exactly once per instance.
    pub fn set_genesis(&self, world: World) -> Result<(), ProtocolError> {
        let mut state = self.write();
        if state.genesis.is_some() {
            return Err(ProtocolError::GenesisAlreadyExists);
        }
        state.genesis = Some(world.world_id.clone());
        state.worlds.insert(world.world_id.clone(), world);
        Ok(())
    }

    /// Add a world plus the edge from its base, atomically from the
    /// lineage's perspective. Returns the edge and whether this transition
    /// forked the base (the base already had a child before this edge).
    pub fn add_world_with_edge(
        &self,
        world: World,
        base_world: &WorldId,
        proposal_id: ProposalId,
        decision_id: DecisionId,
    ) -> Result<(WorldEdge, bool), ProtocolError> {
        let mut state = self.write();
        if !state.worlds.contains_key(base_world) {
            return Err(ProtocolError::Internal {
                reason: format!("lineage has no base world {base_world}"),
            });
        }
        let forked = state
            .children
            .get(base_world)
            .map(|children| !children.is_empty())
            .unwrap_or(false);

        let edge = WorldEdge::new(
            base_world.clone(),
            world.world_id.clone(),
            proposal_id,
            decision_id,
        );
        state.worlds.insert(world.world_id.clone(), world);
        state.edges.insert(edge.edge_id.clone(), edge.clone());
        state
            .parent_edge
            .insert(edge.to.clone(), edge.edge_id.clone());
        state
            .children
            .entry(base_world.clone())
            .or_default()
            .push(edge.edge_id.clone());
        Ok((edge, forked))
    }

    pub fn contains(&self, world: &WorldId) -> bool {
        self.read().worlds.contains_key(world)
    }

    pub fn genesis(&self) -> Option<WorldId> {
        self.read().genesis.clone()
    }

    pub fn has_children(&self, world: &WorldId) -> bool {
        self.read()
            .children
            .get(world)
            .map(|children| !children.is_empty())
            .unwrap_or(false)
    }

    pub fn parent_of(&self, world: &WorldId) -> Option<WorldId> {
        let state = self.read();
        let edge_id = state.parent_edge.get(world)?;
        state.edges.get(edge_id).map(|edge| edge.from.clone())
    }

    pub fn children_of(&self, world: &WorldId) -> Vec<WorldId> {
        let state = self.read();
        state
            .children
            .get(world)
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|edge_id| state.edges.get(edge_id))
                    .map(|edge| edge.to.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Walk from a world back to genesis, inclusive on both ends.
    pub fn ancestry(&self, world: &WorldId) -> Vec<WorldId> {
        let state = self.read();
        let mut chain = Vec::new();
        let mut cursor = world.clone();
        while state.worlds.contains_key(&cursor) {
            chain.push(cursor.clone());
            match state
                .parent_edge
                .get(&cursor)
                .and_then(|edge_id| state.edges.get(edge_id))
            {
                Some(edge) => cursor = edge.from.clone(),
                None => break,
            }
        }
        chain
    }

    /// Edge count from genesis to this world; 0 for genesis itself.
    pub fn depth(&self, world: &WorldId) -> Option<usize> {
        if !self.contains(world) {
            return None;
        }
        Some(self.ancestry(world).len() - 1)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LineageState> {
        self.inner.read().expect("lineage lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LineageState> {
        self.inner.write().expect("lineage lock poisoned")
    }
}

impl Default for WorldLineage {
    fn default() -> Self {
        Self::new()
    }
}
