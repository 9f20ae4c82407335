//! End-to-end lifecycle tests for the orchestrator against the in-memory
//! store: submission through decision, execution, lineage, and branch
//! switching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use manifesto_core::{
    BufferingEventSink, ExecutionContext, ExecutionRun, ExecutorFailure, HostExecutor,
    ManifestoWorld,
};
use manifesto_store::{
    InMemoryWorldStore, ProposalFilter, StoreResult, StoreStats, WorldStore,
};
use manifesto_types::{
    ActorAuthorityBinding, ActorId, AuthorityPolicy, DecisionId, DecisionRecord, EdgeId,
    IntentInstance, PolicyRule, Proposal, ProposalId, ProposalStatus, RuleEffect, Ruling,
    ScopeGrant, Snapshot, World, WorldEdge, WorldEventKind, WorldId,
};

const SCHEMA: &str = "schema-test-1";

/// Applies `{"kind": "increment"}` intents to a counter in the state;
/// any other kind passes the state through unchanged.
struct CounterExecutor {
    seen_scope: Mutex<Option<Option<Value>>>,
}

impl CounterExecutor {
    fn new() -> Self {
        Self {
            seen_scope: Mutex::new(None),
        }
    }

    fn last_scope(&self) -> Option<Option<Value>> {
        self.seen_scope.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostExecutor for CounterExecutor {
    async fn execute(
        &self,
        _execution_key: &str,
        base_snapshot: &Snapshot,
        intent: &IntentInstance,
        context: &ExecutionContext,
    ) -> Result<ExecutionRun, ExecutorFailure> {
        *self.seen_scope.lock().unwrap() = Some(context.approved_scope.clone());
        let mut state = base_snapshot.state.clone();
        match intent.kind() {
            Some("increment") => {
                let count = state["count"].as_i64().unwrap_or(0);
                state["count"] = json!(count + 1);
            }
            Some("set") => {
                let key = intent.body["key"].as_str().unwrap_or("tag");
                state[key] = intent.body["value"].clone();
            }
            _ => {}
        }
        Ok(ExecutionRun::new(Snapshot::new(state)))
    }
}

/// Returns whatever snapshot it was configured with, or an infrastructure
/// failure.
enum ScriptedOutcome {
    Snapshot(Snapshot),
    Failure(String),
}

struct ScriptedExecutor {
    outcome: ScriptedOutcome,
}

#[async_trait]
impl HostExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _execution_key: &str,
        _base_snapshot: &Snapshot,
        _intent: &IntentInstance,
        _context: &ExecutionContext,
    ) -> Result<ExecutionRun, ExecutorFailure> {
        match &self.outcome {
            ScriptedOutcome::Snapshot(snapshot) => Ok(ExecutionRun::new(snapshot.clone())),
            ScriptedOutcome::Failure(summary) => Err(ExecutorFailure(summary.clone())),
        }
    }
}

fn alice() -> ActorId {
    ActorId::new("alice")
}

fn increment(actor: &ActorId) -> IntentInstance {
    IntentInstance::new(SCHEMA, actor.clone(), json!({"kind": "increment"}))
}

fn world_with(
    executor: Arc<dyn HostExecutor>,
) -> (Arc<ManifestoWorld>, Arc<BufferingEventSink>) {
    let store = Arc::new(InMemoryWorldStore::new());
    let sink = Arc::new(BufferingEventSink::new());
    let world = ManifestoWorld::new(SCHEMA, store)
        .with_event_sink(sink.clone())
        .with_executor(executor);
    (Arc::new(world), sink)
}

fn event_kinds(sink: &BufferingEventSink) -> Vec<WorldEventKind> {
    sink.events().iter().map(|e| e.kind()).collect()
}

#[tokio::test]
async fn auto_approved_proposal_executes_into_a_new_world() {
    let (world, sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let result = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();

    assert_eq!(result.proposal.status, ProposalStatus::Completed);
    assert!(result.error.is_none());
    let decision = result.decision.expect("auto-approve records a decision");
    assert_eq!(decision.ruling, Ruling::Approved);
    assert_eq!(decision.authority.0, "auto");

    let new_world = result.world.expect("execution produced a world");
    assert_ne!(new_world.world_id, genesis.world_id);
    assert_eq!(result.proposal.result_world, Some(new_world.world_id.clone()));
    let snapshot = world.get_snapshot(&new_world.world_id).await.unwrap().unwrap();
    assert_eq!(snapshot.state["count"], json!(1));

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.worlds, 2);
    assert_eq!(stats.edges, 1);
    assert_eq!(stats.decisions, 1);

    assert_eq!(
        event_kinds(&sink),
        vec![
            WorldEventKind::WorldCreated, // genesis
            WorldEventKind::ProposalSubmitted,
            WorldEventKind::ProposalEvaluating,
            WorldEventKind::ProposalDecided,
            WorldEventKind::WorldCreated,
            WorldEventKind::ExecutionCompleted,
        ]
    );
}

#[tokio::test]
async fn approval_without_an_executor_stops_at_approved() {
    let store = Arc::new(InMemoryWorldStore::new());
    let world = ManifestoWorld::new(SCHEMA, store);
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let result = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();

    assert_eq!(result.proposal.status, ProposalStatus::Approved);
    assert!(result.decision.is_some());
    assert!(result.world.is_none());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn hitl_holds_the_proposal_until_the_decision_arrives() {
    let (world, sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .register_actor(
            alice(),
            AuthorityPolicy::Hitl {
                delegate: ActorId::new("reviewer"),
            },
        )
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let pending = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    assert_eq!(pending.proposal.status, ProposalStatus::Evaluating);
    assert!(pending.decision.is_none());
    assert!(pending.world.is_none());

    let rejected = world
        .process_hitl_decision(
            &pending.proposal.proposal_id,
            Ruling::Rejected,
            Some("out of scope".into()),
            ScopeGrant::Unspecified,
        )
        .await
        .unwrap();
    assert_eq!(rejected.proposal.status, ProposalStatus::Rejected);
    let decision = rejected.decision.expect("rejection records a decision");
    assert_eq!(decision.ruling, Ruling::Rejected);
    assert_eq!(decision.reason.as_deref(), Some("out of scope"));
    assert!(rejected.world.is_none());

    // Rejection produces no world and no edge.
    let stats = world.stats().await.unwrap();
    assert_eq!(stats.worlds, 1);
    assert_eq!(stats.edges, 0);

    // Delivering a second decision fails: the slot was consumed.
    let second = world
        .process_hitl_decision(
            &pending.proposal.proposal_id,
            Ruling::Approved,
            None,
            ScopeGrant::Unspecified,
        )
        .await
        .unwrap_err();
    assert_eq!(second.code(), "HITL_NOT_PENDING");

    assert_eq!(
        event_kinds(&sink),
        vec![
            WorldEventKind::WorldCreated,
            WorldEventKind::ProposalSubmitted,
            WorldEventKind::ProposalEvaluating,
            WorldEventKind::ProposalDecided,
        ]
    );
}

#[tokio::test]
async fn hitl_approval_scope_reaches_the_executor() {
    let executor = Arc::new(CounterExecutor::new());
    let (world, _sink) = world_with(executor.clone());
    world
        .register_actor(
            alice(),
            AuthorityPolicy::Hitl {
                delegate: ActorId::new("reviewer"),
            },
        )
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let pending = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    let approved = world
        .process_hitl_decision(
            &pending.proposal.proposal_id,
            Ruling::Approved,
            None,
            ScopeGrant::Scoped(json!({"paths": ["/tmp"]})),
        )
        .await
        .unwrap();

    assert_eq!(approved.proposal.status, ProposalStatus::Completed);
    assert_eq!(
        approved.proposal.approved_scope,
        Some(json!({"paths": ["/tmp"]}))
    );
    assert_eq!(
        executor.last_scope(),
        Some(Some(json!({"paths": ["/tmp"]})))
    );
}

#[tokio::test]
async fn unspecified_grant_falls_back_to_the_proposed_scope() {
    let executor = Arc::new(CounterExecutor::new());
    let (world, _sink) = world_with(executor.clone());
    world
        .register_actor(
            alice(),
            AuthorityPolicy::Hitl {
                delegate: ActorId::new("reviewer"),
            },
        )
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let intent = increment(&alice()).with_scope_proposal(json!({"paths": ["/srv"]}));
    let pending = world
        .submit_proposal(&alice(), intent, &genesis.world_id)
        .await
        .unwrap();
    let approved = world
        .process_hitl_decision(
            &pending.proposal.proposal_id,
            Ruling::Approved,
            None,
            ScopeGrant::Unspecified,
        )
        .await
        .unwrap();

    assert_eq!(approved.proposal.status, ProposalStatus::Completed);
    assert_eq!(executor.last_scope(), Some(Some(json!({"paths": ["/srv"]}))));
}

#[tokio::test]
async fn policy_rules_decide_synchronously() {
    let (world, _sink) = world_with(Arc::new(CounterExecutor::new()));
    world.conditions().register("is_increment", |p: &Proposal| {
        p.intent.kind() == Some("increment")
    });
    world
        .register_actor(
            alice(),
            AuthorityPolicy::PolicyRules {
                rules: vec![PolicyRule {
                    name: "allow-increments".into(),
                    conditions: vec!["is_increment".into()],
                    effect: RuleEffect::Approve,
                    reason: None,
                    scope: ScopeGrant::Unrestricted,
                }],
                default_effect: RuleEffect::Reject,
            },
        )
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let allowed = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    assert_eq!(allowed.proposal.status, ProposalStatus::Completed);

    let denied = world
        .submit_proposal(
            &alice(),
            IntentInstance::new(SCHEMA, alice(), json!({"kind": "wipe"})),
            &genesis.world_id,
        )
        .await
        .unwrap();
    assert_eq!(denied.proposal.status, ProposalStatus::Rejected);
    assert_eq!(
        denied.decision.unwrap().reason.as_deref(),
        Some("no policy rule matched")
    );
}

#[tokio::test]
async fn identical_terminal_content_merges_without_a_new_edge() {
    let (world, sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let first = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    let second = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();

    assert_eq!(second.proposal.status, ProposalStatus::Completed);
    assert_eq!(
        first.world.as_ref().unwrap().world_id,
        second.world.as_ref().unwrap().world_id
    );

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.worlds, 2);
    assert_eq!(stats.edges, 1);

    // The merge still reports completion, but no fork ever happened.
    let kinds = event_kinds(&sink);
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == WorldEventKind::ExecutionCompleted)
            .count(),
        2
    );
    assert!(!kinds.contains(&WorldEventKind::WorldForked));
}

#[tokio::test]
async fn divergent_proposals_fork_the_base_world() {
    let (world, sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0, "tag": "genesis"})))
        .await
        .unwrap();

    let set_tag = |value: &str| {
        IntentInstance::new(
            SCHEMA,
            alice(),
            json!({"kind": "set", "key": "tag", "value": value}),
        )
    };

    let first = world
        .submit_proposal(&alice(), set_tag("a"), &genesis.world_id)
        .await
        .unwrap();
    let second = world
        .submit_proposal(&alice(), set_tag("b"), &genesis.world_id)
        .await
        .unwrap();

    let first_world = first.world.unwrap().world_id;
    let second_world = second.world.unwrap().world_id;
    assert_ne!(first_world, second_world);

    let lineage = world.lineage();
    assert_eq!(lineage.children_of(&genesis.world_id).len(), 2);
    assert_eq!(lineage.parent_of(&second_world), Some(genesis.world_id.clone()));
    assert_eq!(
        lineage.ancestry(&second_world),
        vec![second_world.clone(), genesis.world_id.clone()]
    );

    // The second child carries the fork event; the first does not.
    let kinds = event_kinds(&sink);
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == WorldEventKind::WorldForked)
            .count(),
        1
    );
}

#[tokio::test]
async fn failed_terminal_snapshot_fails_the_proposal() {
    let failing = Arc::new(ScriptedExecutor {
        outcome: ScriptedOutcome::Snapshot(
            Snapshot::new(json!({"count": 0})).with_last_error("constraint violated"),
        ),
    });
    let (world, sink) = world_with(failing);
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 1})))
        .await
        .unwrap();

    let result = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();

    assert_eq!(result.proposal.status, ProposalStatus::Failed);
    // Domain failure: derived from the snapshot, not an orchestrator error.
    assert!(result.error.is_none());
    let failed_world = result.world.expect("failed executions still record a world");
    assert_ne!(failed_world.world_id, genesis.world_id);

    let kinds = event_kinds(&sink);
    assert!(kinds.contains(&WorldEventKind::ExecutionFailed));
    assert!(!kinds.contains(&WorldEventKind::ExecutionCompleted));
}

#[tokio::test]
async fn executor_failure_lands_back_on_the_base_world() {
    let broken = Arc::new(ScriptedExecutor {
        outcome: ScriptedOutcome::Failure("sandbox crashed".into()),
    });
    let (world, sink) = world_with(broken);
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let result = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();

    assert_eq!(result.proposal.status, ProposalStatus::Failed);
    let error = result.error.expect("infrastructure failures surface in the result");
    assert_eq!(error.code(), "EXECUTOR_ERROR");
    // No semantic progress: the terminal world is the base world itself.
    assert_eq!(result.world.unwrap().world_id, genesis.world_id);

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.worlds, 1);
    assert_eq!(stats.edges, 0);
    assert!(event_kinds(&sink).contains(&WorldEventKind::ExecutionFailed));
}

#[tokio::test]
async fn genesis_is_created_at_most_once() {
    let (world, _sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let error = world
        .create_genesis(Snapshot::new(json!({"count": 99})))
        .await
        .unwrap_err();
    assert_eq!(error.code(), "GENESIS_ALREADY_EXISTS");

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.worlds, 1);
}

#[tokio::test]
async fn mid_effect_base_worlds_are_rejected() {
    let (world, _sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(
            Snapshot::new(json!({"count": 0}))
                .with_pending_requirement("io", json!({"url": "file:///x"})),
        )
        .await
        .unwrap();

    let error = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap_err();
    assert_eq!(error.code(), "INVALID_BASE_WORLD");

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.proposals, 0);
}

#[tokio::test]
async fn submission_preconditions_fail_fast() {
    let (world, _sink) = world_with(Arc::new(CounterExecutor::new()));
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    // Unregistered actor.
    let error = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap_err();
    assert_eq!(error.code(), "ACTOR_NOT_REGISTERED");

    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();

    // Unknown base world.
    let error = world
        .submit_proposal(
            &alice(),
            increment(&alice()),
            &WorldId::derive(SCHEMA, "no-such-snapshot"),
        )
        .await
        .unwrap_err();
    assert_eq!(error.code(), "WORLD_NOT_FOUND");

    // Intent origin must match the submitting actor.
    let error = world
        .submit_proposal(
            &alice(),
            increment(&ActorId::new("mallory")),
            &genesis.world_id,
        )
        .await
        .unwrap_err();
    assert_eq!(error.code(), "INVALID_ARGUMENT");

    // Tampered intent key.
    let mut tampered = increment(&alice());
    tampered.intent_key = "not-the-real-key".into();
    let error = world
        .submit_proposal(&alice(), tampered, &genesis.world_id)
        .await
        .unwrap_err();
    assert_eq!(error.code(), "INVALID_ARGUMENT");

    // Non-object intent body.
    let error = world
        .submit_proposal(
            &alice(),
            IntentInstance::new(SCHEMA, alice(), json!("just a string")),
            &genesis.world_id,
        )
        .await
        .unwrap_err();
    assert_eq!(error.code(), "INVALID_ARGUMENT");

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.proposals, 0);
}

#[tokio::test]
async fn branch_switch_requires_a_known_world() {
    let (world, _sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let error = world
        .switch_branch(&WorldId::derive(SCHEMA, "missing"))
        .await
        .unwrap_err();
    assert_eq!(error.code(), "WORLD_NOT_FOUND");
    assert_eq!(world.current_epoch(), 1);
}

#[tokio::test]
async fn hitl_decision_after_a_branch_switch_is_superseded() {
    let (world, _sink) = world_with(Arc::new(CounterExecutor::new()));
    world
        .register_actor(
            alice(),
            AuthorityPolicy::Hitl {
                delegate: ActorId::new("reviewer"),
            },
        )
        .await
        .unwrap();
    let bob = ActorId::new("bob");
    world
        .register_actor(bob.clone(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let pending = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    assert_eq!(pending.proposal.status, ProposalStatus::Evaluating);

    // Bob completes a proposal and the branch moves to its result.
    let advanced = world
        .submit_proposal(&bob, increment(&bob), &genesis.world_id)
        .await
        .unwrap();
    let head = advanced.world.unwrap().world_id;
    assert_eq!(world.switch_branch(&head).await.unwrap(), 2);
    assert_eq!(world.current_world(), Some(head));

    // The late decision aborts without a DecisionRecord.
    let superseded = world
        .process_hitl_decision(
            &pending.proposal.proposal_id,
            Ruling::Approved,
            None,
            ScopeGrant::Unspecified,
        )
        .await
        .unwrap();
    assert!(superseded.decision.is_none());
    assert!(superseded.world.is_none());
    assert_eq!(superseded.error.unwrap().code(), "INVALID_ARGUMENT");
    assert_eq!(superseded.proposal.status, ProposalStatus::Evaluating);

    let stats = world.stats().await.unwrap();
    assert_eq!(stats.decisions, 1); // bob's only
}

/// Store wrapper that can hold `save_proposal` calls at a gate, so a
/// branch switch can be interleaved while a submission is still in the
/// ingress stage.
struct GatedStore {
    inner: InMemoryWorldStore,
    gate: Semaphore,
    gated: AtomicBool,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: InMemoryWorldStore::new(),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
        }
    }

    fn close(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    fn open(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.add_permits(64);
    }
}

#[async_trait]
impl WorldStore for GatedStore {
    async fn save_world(&self, world: World) -> StoreResult<()> {
        self.inner.save_world(world).await
    }
    async fn get_world(&self, id: &WorldId) -> StoreResult<Option<World>> {
        self.inner.get_world(id).await
    }
    async fn list_worlds(&self) -> StoreResult<Vec<World>> {
        self.inner.list_worlds().await
    }
    async fn save_snapshot(&self, world: &WorldId, snapshot: Snapshot) -> StoreResult<()> {
        self.inner.save_snapshot(world, snapshot).await
    }
    async fn get_snapshot(&self, world: &WorldId) -> StoreResult<Option<Snapshot>> {
        self.inner.get_snapshot(world).await
    }
    async fn save_edge(&self, edge: WorldEdge) -> StoreResult<()> {
        self.inner.save_edge(edge).await
    }
    async fn get_edge(&self, id: &EdgeId) -> StoreResult<Option<WorldEdge>> {
        self.inner.get_edge(id).await
    }
    async fn list_edges_from(&self, world: &WorldId) -> StoreResult<Vec<WorldEdge>> {
        self.inner.list_edges_from(world).await
    }
    async fn save_proposal(&self, proposal: Proposal) -> StoreResult<()> {
        if self.gated.load(Ordering::SeqCst) {
            let _permit = self.gate.acquire().await.expect("gate semaphore closed");
        }
        self.inner.save_proposal(proposal).await
    }
    async fn update_proposal(&self, proposal: Proposal) -> StoreResult<()> {
        self.inner.update_proposal(proposal).await
    }
    async fn delete_proposal(&self, id: &ProposalId) -> StoreResult<bool> {
        self.inner.delete_proposal(id).await
    }
    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<Proposal>> {
        self.inner.get_proposal(id).await
    }
    async fn list_proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>> {
        self.inner.list_proposals(filter).await
    }
    async fn save_decision(&self, decision: DecisionRecord) -> StoreResult<()> {
        self.inner.save_decision(decision).await
    }
    async fn get_decision(&self, id: &DecisionId) -> StoreResult<Option<DecisionRecord>> {
        self.inner.get_decision(id).await
    }
    async fn list_decisions_for(&self, proposal: &ProposalId) -> StoreResult<Vec<DecisionRecord>> {
        self.inner.list_decisions_for(proposal).await
    }
    async fn save_binding(&self, binding: ActorAuthorityBinding) -> StoreResult<()> {
        self.inner.save_binding(binding).await
    }
    async fn get_binding(&self, actor: &ActorId) -> StoreResult<Option<ActorAuthorityBinding>> {
        self.inner.get_binding(actor).await
    }
    async fn remove_binding(&self, actor: &ActorId) -> StoreResult<bool> {
        self.inner.remove_binding(actor).await
    }
    async fn list_bindings(&self) -> StoreResult<Vec<ActorAuthorityBinding>> {
        self.inner.list_bindings().await
    }
    async fn set_genesis(&self, world: &WorldId) -> StoreResult<()> {
        self.inner.set_genesis(world).await
    }
    async fn get_genesis(&self) -> StoreResult<Option<WorldId>> {
        self.inner.get_genesis().await
    }
    async fn get_stats(&self) -> StoreResult<StoreStats> {
        self.inner.get_stats().await
    }
}

#[tokio::test]
async fn branch_switch_evicts_proposals_still_in_ingress() {
    let store = Arc::new(GatedStore::new());
    let sink = Arc::new(BufferingEventSink::new());
    let world = Arc::new(
        ManifestoWorld::new(SCHEMA, store.clone())
            .with_event_sink(sink.clone())
            .with_executor(Arc::new(CounterExecutor::new())),
    );
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    // Build the world the branch will switch to.
    let advanced = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    let head = advanced.world.unwrap().world_id;

    // Hold the next submission at the ingress stage.
    store.close();
    let submit = tokio::spawn({
        let world = world.clone();
        let base = genesis.world_id.clone();
        async move {
            world
                .submit_proposal(&alice(), increment(&alice()), &base)
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let epoch = world.switch_branch(&head).await.unwrap();
    assert_eq!(epoch, 2);

    store.open();
    let result = submit.await.unwrap().unwrap();

    assert!(result.decision.is_none());
    assert!(result.world.is_none());
    let error = result.error.expect("evicted submissions report supersession");
    assert_eq!(error.code(), "INVALID_ARGUMENT");

    // Exactly one superseded event, and the proposal left no trace.
    let superseded: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.kind() == WorldEventKind::ProposalSuperseded)
        .collect();
    assert_eq!(superseded.len(), 1);
    assert!(world
        .get_proposal(&result.proposal.proposal_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn one_branch_switch_evicts_ingress_proposals_from_every_actor() {
    let store = Arc::new(GatedStore::new());
    let sink = Arc::new(BufferingEventSink::new());
    let world = Arc::new(
        ManifestoWorld::new(SCHEMA, store.clone())
            .with_event_sink(sink.clone())
            .with_executor(Arc::new(CounterExecutor::new())),
    );
    let bob = ActorId::new("bob");
    world
        .register_actor(alice(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    world
        .register_actor(bob.clone(), AuthorityPolicy::AutoApprove)
        .await
        .unwrap();
    let genesis = world
        .create_genesis(Snapshot::new(json!({"count": 0})))
        .await
        .unwrap();

    let advanced = world
        .submit_proposal(&alice(), increment(&alice()), &genesis.world_id)
        .await
        .unwrap();
    let head = advanced.world.unwrap().world_id;

    // Hold both actors' submissions in the ingress stage.
    store.close();
    let alice_submit = tokio::spawn({
        let world = world.clone();
        let base = genesis.world_id.clone();
        async move {
            world
                .submit_proposal(&alice(), increment(&alice()), &base)
                .await
        }
    });
    let bob_submit = tokio::spawn({
        let world = world.clone();
        let actor = bob.clone();
        let base = genesis.world_id.clone();
        async move {
            world
                .submit_proposal(&actor, increment(&actor), &base)
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(world.switch_branch(&head).await.unwrap(), 2);
    store.open();

    let alice_result = alice_submit.await.unwrap().unwrap();
    let bob_result = bob_submit.await.unwrap().unwrap();

    for result in [&alice_result, &bob_result] {
        assert!(result.decision.is_none());
        assert!(result.world.is_none());
        assert_eq!(
            result.error.as_ref().expect("eviction is reported").code(),
            "INVALID_ARGUMENT"
        );
        assert!(world
            .get_proposal(&result.proposal.proposal_id)
            .await
            .unwrap()
            .is_none());
    }

    // One superseded event per evicted proposal, no more.
    let superseded: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.kind() == WorldEventKind::ProposalSuperseded)
        .collect();
    assert_eq!(superseded.len(), 2);
    let evicted: std::collections::HashSet<_> = superseded
        .iter()
        .filter_map(|e| e.proposal().cloned())
        .collect();
    assert!(evicted.contains(&alice_result.proposal.proposal_id));
    assert!(evicted.contains(&bob_result.proposal.proposal_id));
}
