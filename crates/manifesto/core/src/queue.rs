use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;

use manifesto_types::{DecisionId, Proposal, ProposalId, ProposalStatus, WorldId};

/// Fields attached to a proposal during a transition.
#[derive(Clone, Debug, Default)]
pub struct TransitionExtras {
    pub decision_id: Option<DecisionId>,
    pub approved_scope: Option<Value>,
    pub result_world: Option<WorldId>,
}

impl TransitionExtras {
    pub fn decision(decision_id: DecisionId, approved_scope: Option<Value>) -> Self {
        Self {
            decision_id: Some(decision_id),
            approved_scope,
            result_world: None,
        }
    }

    pub fn result(result_world: WorldId) -> Self {
        Self {
            decision_id: None,
            approved_scope: None,
            result_world: Some(result_world),
        }
    }
}

/// Holds in-flight proposals and enforces the legal status transitions.
///
/// Transitioning an unknown proposal, or moving backwards in the state
/// machine, is a programming error and panics; domain-level failures are
/// handled before a transition is attempted.
pub struct ProposalQueue {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
}

impl ProposalQueue {
    pub fn new() -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
        }
    }

    /// Enqueue a proposal in `submitted` state.
    pub fn submit(&self, proposal: Proposal) {
        assert_eq!(
            proposal.status,
            ProposalStatus::Submitted,
            "proposals enter the queue in submitted state"
        );
        self.write().insert(proposal.proposal_id.clone(), proposal);
    }

    /// Move a proposal forward, attaching decision/result fields and the
    /// matching timestamps. Returns the updated proposal.
    pub fn transition(
        &self,
        id: &ProposalId,
        next: ProposalStatus,
        extras: TransitionExtras,
    ) -> Proposal {
        self.try_transition(id, next, extras)
            .unwrap_or_else(|| panic!("transition on unknown proposal {id}"))
    }

    /// Like [`Self::transition`], but `None` when the proposal is no longer
    /// queued. Membership check and movement happen under one write lock,
    /// so a concurrent eviction cannot slip between them. Illegal movement
    /// of a present proposal still panics.
    pub fn try_transition(
        &self,
        id: &ProposalId,
        next: ProposalStatus,
        extras: TransitionExtras,
    ) -> Option<Proposal> {
        let mut proposals = self.write();
        let proposal = proposals.get_mut(id)?;
        assert!(
            proposal.status.can_transition_to(next),
            "illegal proposal transition {} -> {} for {id}",
            proposal.status,
            next
        );

        proposal.status = next;
        if let Some(decision_id) = extras.decision_id {
            proposal.decision_id = Some(decision_id);
            proposal.decided_at = Some(Utc::now());
        }
        if extras.approved_scope.is_some() {
            proposal.approved_scope = extras.approved_scope;
        }
        if let Some(result_world) = extras.result_world {
            proposal.result_world = Some(result_world);
        }
        if matches!(next, ProposalStatus::Completed | ProposalStatus::Failed) {
            proposal.completed_at = Some(Utc::now());
        }
        Some(proposal.clone())
    }

    pub fn get(&self, id: &ProposalId) -> Option<Proposal> {
        self.read().get(id).cloned()
    }

    pub fn remove(&self, id: &ProposalId) -> Option<Proposal> {
        self.write().remove(id)
    }

    /// Proposals still in the ingress stage (pre-evaluation), the set a
    /// branch switch may evict.
    pub fn ingress_stage(&self) -> Vec<Proposal> {
        self.by_status(ProposalStatus::Submitted)
    }

    pub fn by_status(&self, status: ProposalStatus) -> Vec<Proposal> {
        let mut matched: Vec<Proposal> = self
            .read()
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        matched.sort_by_key(|p| p.submitted_at);
        matched
    }

    pub fn list(&self) -> Vec<Proposal> {
        let mut all: Vec<Proposal> = self.read().values().cloned().collect();
        all.sort_by_key(|p| p.submitted_at);
        all
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ProposalId, Proposal>> {
        self.proposals.read().expect("proposal queue lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ProposalId, Proposal>> {
        self.proposals.write().expect("proposal queue lock poisoned")
    }
}

impl Default for ProposalQueue {
    fn default() -> Self {
        Self::new()
    }
}
