use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use manifesto_store::{ProposalFilter, StoreStats, WorldStore};
use manifesto_types::{
    intent_key, ActorAuthorityBinding, ActorId, AuthorityPolicy, AuthorityRef, DecisionRecord,
    ExecutionDisposition, IntentInstance, Proposal, ProposalId, ProposalStatus, Ruling,
    ScopeGrant, Snapshot, SupersededReason, World, WorldEvent, WorldId,
};

use crate::authority::{AuthorityEvaluator, ConditionRegistry, Verdict};
use crate::error::ProtocolError;
use crate::events::{NullEventSink, WorldEventSink};
use crate::executor::{DefaultKeyPolicy, ExecutionContext, ExecutionKeyPolicy, HostExecutor};
use crate::ingress::IngressContext;
use crate::lineage::WorldLineage;
use crate::queue::{ProposalQueue, TransitionExtras};
use crate::registry::ActorRegistry;

/// Terminal view of one protocol operation on a proposal.
///
/// Preconditions fail the call itself; epoch staleness and execution-time
/// failures are expected outcomes of concurrent operation and land in
/// `error` instead, alongside the proposal as last observed.
#[derive(Clone, Debug)]
pub struct ProposalResult {
    pub proposal: Proposal,
    pub decision: Option<DecisionRecord>,
    pub world: Option<World>,
    pub error: Option<ProtocolError>,
}

impl ProposalResult {
    fn pending(proposal: Proposal) -> Self {
        Self {
            proposal,
            decision: None,
            world: None,
            error: None,
        }
    }

    fn superseded(proposal: Proposal, reason: impl Into<String>) -> Self {
        Self {
            proposal,
            decision: None,
            world: None,
            error: Some(ProtocolError::invalid_argument(reason)),
        }
    }
}

/// World Protocol orchestrator: composes the actor registry, proposal
/// queue, authority evaluator, lineage, and epoch tracking into the public
/// protocol surface.
///
/// Persistence goes through the [`WorldStore`] port; state computation
/// through the optional [`HostExecutor`] port. Without an executor,
/// approved proposals stay `approved` and execution is the caller's
/// responsibility.
pub struct ManifestoWorld {
    schema_hash: String,
    store: Arc<dyn WorldStore>,
    registry: ActorRegistry,
    queue: ProposalQueue,
    evaluator: AuthorityEvaluator,
    lineage: WorldLineage,
    ingress: IngressContext,
    sink: Arc<dyn WorldEventSink>,
    executor: Option<Arc<dyn HostExecutor>>,
    key_policy: Arc<dyn ExecutionKeyPolicy>,
    current_head: RwLock<Option<WorldId>>,
    // Existing-world check plus lineage/edge insertion must act as one
    // consistency unit even though the store calls are separate.
    commit_lock: Mutex<()>,
}

impl ManifestoWorld {
    pub fn new(schema_hash: impl Into<String>, store: Arc<dyn WorldStore>) -> Self {
        Self {
            schema_hash: schema_hash.into(),
            store,
            registry: ActorRegistry::new(),
            queue: ProposalQueue::new(),
            evaluator: AuthorityEvaluator::default(),
            lineage: WorldLineage::new(),
            ingress: IngressContext::new(),
            sink: Arc::new(NullEventSink),
            executor: None,
            key_policy: Arc::new(DefaultKeyPolicy),
            current_head: RwLock::new(None),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn WorldEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn HostExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_key_policy(mut self, policy: Arc<dyn ExecutionKeyPolicy>) -> Self {
        self.key_policy = policy;
        self
    }

    /// Named predicates available to `policy_rules` authorities.
    pub fn conditions(&self) -> &ConditionRegistry {
        self.evaluator.conditions()
    }

    pub fn lineage(&self) -> &WorldLineage {
        &self.lineage
    }

    pub fn schema_hash(&self) -> &str {
        &self.schema_hash
    }

    pub fn current_epoch(&self) -> u64 {
        self.ingress.current()
    }

    /// Head of the active branch: genesis at first, then whatever
    /// `switch_branch` selected.
    pub fn current_world(&self) -> Option<WorldId> {
        self.current_head
            .read()
            .expect("current head lock poisoned")
            .clone()
    }

    /// Register an actor under an authority policy; re-registration
    /// replaces the binding.
    pub async fn register_actor(
        &self,
        actor: ActorId,
        policy: AuthorityPolicy,
    ) -> Result<ActorAuthorityBinding, ProtocolError> {
        let binding = self.registry.register(actor, policy);
        self.store.save_binding(binding.clone()).await?;
        Ok(binding)
    }

    /// Replace the policy of an already-registered actor.
    pub async fn update_actor_binding(
        &self,
        actor: &ActorId,
        policy: AuthorityPolicy,
    ) -> Result<ActorAuthorityBinding, ProtocolError> {
        let binding = self.registry.update_binding(actor, policy)?;
        self.store.save_binding(binding.clone()).await?;
        Ok(binding)
    }

    /// Create the genesis world from an initial snapshot. Fails if a
    /// genesis world is already stored; the failing call has no side
    /// effects.
    pub async fn create_genesis(&self, snapshot: Snapshot) -> Result<World, ProtocolError> {
        if self.store.get_genesis().await?.is_some() {
            return Err(ProtocolError::GenesisAlreadyExists);
        }

        let world = World::derive(&self.schema_hash, &snapshot, None);
        self.store.save_world(world.clone()).await?;
        self.store
            .save_snapshot(&world.world_id, snapshot)
            .await?;
        self.store.set_genesis(&world.world_id).await?;
        self.lineage.set_genesis(world.clone())?;
        *self
            .current_head
            .write()
            .expect("current head lock poisoned") = Some(world.world_id.clone());

        info!(world = %world.world_id, "genesis world created");
        self.sink.emit(WorldEvent::WorldCreated {
            world: world.world_id.clone(),
            from: None,
            proposal: None,
            outcome: None,
            timestamp: Utc::now(),
        });
        Ok(world)
    }

    /// Switch the active branch to another stored world. Increments the
    /// epoch and evicts every proposal still in the ingress stage whose
    /// captured epoch is now stale, emitting `proposal:superseded` for
    /// each.
    pub async fn switch_branch(&self, new_base: &WorldId) -> Result<u64, ProtocolError> {
        if self.store.get_world(new_base).await?.is_none() {
            return Err(ProtocolError::WorldNotFound {
                world: new_base.to_string(),
            });
        }

        let epoch = self.ingress.advance();
        *self
            .current_head
            .write()
            .expect("current head lock poisoned") = Some(new_base.clone());

        for proposal in self.queue.ingress_stage() {
            if proposal.epoch < epoch {
                self.queue.remove(&proposal.proposal_id);
                self.store.delete_proposal(&proposal.proposal_id).await?;
                self.evaluator.discard_pending(&proposal.proposal_id);
                self.sink.emit(WorldEvent::ProposalSuperseded {
                    proposal: proposal.proposal_id.clone(),
                    reason: SupersededReason::BranchSwitch,
                    epoch,
                    timestamp: Utc::now(),
                });
                info!(
                    proposal = %proposal.proposal_id,
                    epoch,
                    "proposal superseded by branch switch"
                );
            }
        }

        info!(world = %new_base, epoch, "branch switched");
        Ok(epoch)
    }

    /// Submit a proposal for an actor against a base world.
    ///
    /// Preconditions fail fast before any state mutation. For blocking
    /// authorities the call returns with the proposal in `evaluating`;
    /// the decision arrives later through [`Self::process_hitl_decision`].
    pub async fn submit_proposal(
        &self,
        actor: &ActorId,
        intent: IntentInstance,
        base_world: &WorldId,
    ) -> Result<ProposalResult, ProtocolError> {
        let binding =
            self.registry
                .get_binding(actor)
                .ok_or_else(|| ProtocolError::ActorNotRegistered {
                    actor: actor.to_string(),
                })?;

        if self.store.get_world(base_world).await?.is_none() {
            return Err(ProtocolError::WorldNotFound {
                world: base_world.to_string(),
            });
        }
        let base_snapshot = self.store.get_snapshot(base_world).await?.ok_or_else(|| {
            ProtocolError::SnapshotNotFound {
                world: base_world.to_string(),
            }
        })?;
        if base_snapshot.is_mid_effect() {
            return Err(ProtocolError::InvalidBaseWorld {
                world: base_world.to_string(),
                reason: "snapshot has outstanding effect requirements".into(),
            });
        }
        if base_snapshot.last_error.is_some() {
            warn!(
                world = %base_world,
                "base world carries a failed snapshot; branching from it is discouraged"
            );
        }

        intent
            .validate()
            .map_err(|error| ProtocolError::invalid_argument(error.to_string()))?;
        if intent.origin.actor != *actor {
            return Err(ProtocolError::invalid_argument(
                "intent origin does not match the submitting actor",
            ));
        }
        if intent.intent_key != intent_key(&self.schema_hash, &intent.body) {
            return Err(ProtocolError::invalid_argument(
                "intent key does not match the schema and body",
            ));
        }

        let proposal_id = ProposalId::new();
        let epoch = self.ingress.current();
        let execution_key = self
            .key_policy
            .derive(&proposal_id, actor, base_world, 1);
        let proposal = Proposal::new(
            proposal_id.clone(),
            execution_key,
            actor.clone(),
            intent,
            base_world.clone(),
            epoch,
        );

        self.queue.submit(proposal.clone());
        self.store.save_proposal(proposal.clone()).await?;
        self.sink.emit(WorldEvent::ProposalSubmitted {
            proposal: proposal_id.clone(),
            actor: actor.clone(),
            base_world: base_world.clone(),
            timestamp: Utc::now(),
        });
        info!(proposal = %proposal_id, actor = %actor, "proposal submitted");

        // A branch switch may have raced the save while the proposal was
        // still in the ingress stage.
        if self.queue.get(&proposal_id).is_none() {
            // Evicted by the switch, which already emitted superseded;
            // discard the copy the save above re-persisted.
            self.store.delete_proposal(&proposal_id).await?;
            return Ok(ProposalResult::superseded(
                proposal,
                "proposal superseded by branch switch",
            ));
        }
        if self.ingress.is_stale(epoch) {
            self.queue.remove(&proposal_id);
            self.store.delete_proposal(&proposal_id).await?;
            self.sink.emit(WorldEvent::ProposalSuperseded {
                proposal: proposal_id.clone(),
                reason: SupersededReason::BranchSwitch,
                epoch: self.ingress.current(),
                timestamp: Utc::now(),
            });
            return Ok(ProposalResult::superseded(
                proposal,
                "proposal superseded by branch switch",
            ));
        }

        // The eviction can also land between the checks above and this
        // transition; only the queue's own lock decides who won.
        let evaluating = match self.queue.try_transition(
            &proposal_id,
            ProposalStatus::Evaluating,
            TransitionExtras::default(),
        ) {
            Some(evaluating) => evaluating,
            None => {
                self.store.delete_proposal(&proposal_id).await?;
                return Ok(ProposalResult::superseded(
                    proposal,
                    "proposal superseded by branch switch",
                ));
            }
        };
        self.store.update_proposal(evaluating.clone()).await?;
        self.sink.emit(WorldEvent::ProposalEvaluating {
            proposal: proposal_id.clone(),
            authority: binding.authority.clone(),
            timestamp: Utc::now(),
        });

        let verdict = self.evaluator.evaluate(&evaluating, &binding);
        if verdict == Verdict::Pending {
            // Blocking authorities, and the defensive branch for
            // non-blocking ones: no DecisionRecord yet.
            return Ok(ProposalResult::pending(evaluating));
        }

        // A branch switch racing the evaluation makes the result stale;
        // abort without a DecisionRecord.
        if self.ingress.is_stale(epoch) {
            return Ok(ProposalResult::superseded(
                evaluating,
                "proposal epoch went stale during evaluation",
            ));
        }

        self.finish_decision(evaluating, &binding.authority, verdict)
            .await
    }

    /// Deliver the out-of-band decision for a proposal suspended on a
    /// blocking authority.
    pub async fn process_hitl_decision(
        &self,
        proposal_id: &ProposalId,
        ruling: Ruling,
        reasoning: Option<String>,
        approved_scope: ScopeGrant,
    ) -> Result<ProposalResult, ProtocolError> {
        let proposal =
            self.queue
                .get(proposal_id)
                .ok_or_else(|| ProtocolError::ProposalNotFound {
                    proposal: proposal_id.to_string(),
                })?;
        if proposal.status != ProposalStatus::Evaluating {
            return Err(ProtocolError::HitlNotPending {
                proposal: proposal_id.to_string(),
            });
        }
        let binding = self.registry.get_binding(&proposal.actor).ok_or_else(|| {
            ProtocolError::ActorNotRegistered {
                actor: proposal.actor.to_string(),
            }
        })?;

        if self.ingress.is_stale(proposal.epoch) {
            return Ok(ProposalResult::superseded(
                proposal,
                "proposal epoch went stale before the decision arrived",
            ));
        }

        let verdict = self
            .evaluator
            .resolve(proposal_id, ruling, reasoning, approved_scope)?;
        self.finish_decision(proposal, &binding.authority, verdict)
            .await
    }

    /// Record the decision, transition the proposal, and execute on
    /// approval when an executor is configured.
    async fn finish_decision(
        &self,
        proposal: Proposal,
        authority: &AuthorityRef,
        verdict: Verdict,
    ) -> Result<ProposalResult, ProtocolError> {
        let (ruling, reason, scope) = match verdict {
            Verdict::Approved { scope, reason } => (Ruling::Approved, reason, scope),
            Verdict::Rejected { reason } => (Ruling::Rejected, reason, ScopeGrant::Unspecified),
            Verdict::Pending => {
                return Err(ProtocolError::Internal {
                    reason: "finish_decision requires a settled verdict".into(),
                })
            }
        };
        let approved_scope = match ruling {
            Ruling::Approved => scope.resolve(&proposal.intent.scope_proposal),
            Ruling::Rejected => None,
        };

        let decision = DecisionRecord::new(
            proposal.proposal_id.clone(),
            authority.clone(),
            ruling,
            reason,
            approved_scope.clone(),
        );
        self.store.save_decision(decision.clone()).await?;
        self.sink.emit(WorldEvent::ProposalDecided {
            proposal: proposal.proposal_id.clone(),
            decision: decision.decision_id.clone(),
            ruling,
            timestamp: Utc::now(),
        });
        info!(
            proposal = %proposal.proposal_id,
            decision = %decision.decision_id,
            ruling = %ruling,
            "proposal decided"
        );

        let next = match ruling {
            Ruling::Approved => ProposalStatus::Approved,
            Ruling::Rejected => ProposalStatus::Rejected,
        };
        let updated = self.queue.transition(
            &proposal.proposal_id,
            next,
            TransitionExtras::decision(decision.decision_id.clone(), approved_scope),
        );
        self.store.update_proposal(updated.clone()).await?;

        if ruling == Ruling::Rejected {
            return Ok(ProposalResult {
                proposal: updated,
                decision: Some(decision),
                world: None,
                error: None,
            });
        }
        if self.executor.is_none() {
            // Approved without an executor is terminal here; execution is
            // the caller's responsibility.
            return Ok(ProposalResult {
                proposal: updated,
                decision: Some(decision),
                world: None,
                error: None,
            });
        }
        self.execute_proposal(updated, decision).await
    }

    /// Run the approved intent through the executor and commit the
    /// resulting world.
    async fn execute_proposal(
        &self,
        proposal: Proposal,
        decision: DecisionRecord,
    ) -> Result<ProposalResult, ProtocolError> {
        let executor = self
            .executor
            .clone()
            .ok_or(ProtocolError::ExecutorNotConfigured)?;
        let base_snapshot = self
            .store
            .get_snapshot(&proposal.base_world)
            .await?
            .ok_or_else(|| ProtocolError::SnapshotNotFound {
                world: proposal.base_world.to_string(),
            })?;

        let executing = self.queue.transition(
            &proposal.proposal_id,
            ProposalStatus::Executing,
            TransitionExtras::default(),
        );
        self.store.update_proposal(executing.clone()).await?;

        let context = ExecutionContext {
            approved_scope: decision.approved_scope.clone(),
        };
        let (terminal, disposition, summary, exec_error) = match executor
            .execute(
                &executing.execution_key,
                &base_snapshot,
                &executing.intent,
                &context,
            )
            .await
        {
            Ok(run) => {
                // Outcome is derived from the terminal snapshot alone; the
                // executor's own return status is never trusted for this.
                let terminal = run.terminal_snapshot;
                if terminal.last_error.is_some() || terminal.is_mid_effect() {
                    let summary = terminal.last_error.clone().unwrap_or_else(|| {
                        "terminal snapshot has outstanding effect requirements".into()
                    });
                    (terminal, ExecutionDisposition::Failed, summary, None)
                } else {
                    (terminal, ExecutionDisposition::Completed, String::new(), None)
                }
            }
            Err(failure) => {
                // Infrastructure failure: no semantic progress, the
                // terminal world is built from the base snapshot.
                warn!(
                    proposal = %executing.proposal_id,
                    error = %failure,
                    "executor failed"
                );
                (
                    base_snapshot.clone(),
                    ExecutionDisposition::Failed,
                    failure.to_string(),
                    Some(ProtocolError::ExecutorError {
                        summary: failure.to_string(),
                    }),
                )
            }
        };

        let guard = self.commit_lock.lock().await;
        let candidate = World::derive(
            &self.schema_hash,
            &terminal,
            Some(executing.proposal_id.clone()),
        );
        let mut forked = false;
        let world = match self.store.get_world(&candidate.world_id).await? {
            Some(existing) => {
                // No-op merge: the content address already exists; only the
                // snapshot is re-persisted, no edge or lineage node.
                self.store
                    .save_snapshot(&existing.world_id, terminal)
                    .await?;
                existing
            }
            None => {
                self.store.save_world(candidate.clone()).await?;
                self.store
                    .save_snapshot(&candidate.world_id, terminal)
                    .await?;
                let (edge, fork) = self.lineage.add_world_with_edge(
                    candidate.clone(),
                    &executing.base_world,
                    executing.proposal_id.clone(),
                    decision.decision_id.clone(),
                )?;
                self.store.save_edge(edge).await?;
                forked = fork;
                candidate
            }
        };
        drop(guard);

        let status = match disposition {
            ExecutionDisposition::Completed => ProposalStatus::Completed,
            ExecutionDisposition::Failed => ProposalStatus::Failed,
        };
        let updated = self.queue.transition(
            &executing.proposal_id,
            status,
            TransitionExtras::result(world.world_id.clone()),
        );
        self.store.update_proposal(updated.clone()).await?;

        // World state is observable before the terminal execution event.
        self.sink.emit(WorldEvent::WorldCreated {
            world: world.world_id.clone(),
            from: Some(executing.base_world.clone()),
            proposal: Some(executing.proposal_id.clone()),
            outcome: Some(disposition),
            timestamp: Utc::now(),
        });
        if forked {
            self.sink.emit(WorldEvent::WorldForked {
                base: executing.base_world.clone(),
                world: world.world_id.clone(),
                proposal: executing.proposal_id.clone(),
                timestamp: Utc::now(),
            });
        }
        match disposition {
            ExecutionDisposition::Completed => {
                self.sink.emit(WorldEvent::ExecutionCompleted {
                    proposal: executing.proposal_id.clone(),
                    world: world.world_id.clone(),
                    timestamp: Utc::now(),
                });
                info!(
                    proposal = %executing.proposal_id,
                    world = %world.world_id,
                    "execution completed"
                );
            }
            ExecutionDisposition::Failed => {
                self.sink.emit(WorldEvent::ExecutionFailed {
                    proposal: executing.proposal_id.clone(),
                    world: world.world_id.clone(),
                    summary: summary.clone(),
                    timestamp: Utc::now(),
                });
                warn!(
                    proposal = %executing.proposal_id,
                    world = %world.world_id,
                    summary = %summary,
                    "execution failed"
                );
            }
        }

        Ok(ProposalResult {
            proposal: updated,
            decision: Some(decision),
            world: Some(world),
            error: exec_error,
        })
    }

    // --- Queries ---

    pub async fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, ProtocolError> {
        Ok(self.store.get_proposal(id).await?)
    }

    pub async fn list_proposals(
        &self,
        filter: &ProposalFilter,
    ) -> Result<Vec<Proposal>, ProtocolError> {
        Ok(self.store.list_proposals(filter).await?)
    }

    pub async fn get_world(&self, id: &WorldId) -> Result<Option<World>, ProtocolError> {
        Ok(self.store.get_world(id).await?)
    }

    pub async fn get_snapshot(&self, id: &WorldId) -> Result<Option<Snapshot>, ProtocolError> {
        Ok(self.store.get_snapshot(id).await?)
    }

    pub async fn get_decision(
        &self,
        id: &manifesto_types::DecisionId,
    ) -> Result<Option<DecisionRecord>, ProtocolError> {
        Ok(self.store.get_decision(id).await?)
    }

    pub async fn stats(&self) -> Result<StoreStats, ProtocolError> {
        Ok(self.store.get_stats().await?)
    }
}
