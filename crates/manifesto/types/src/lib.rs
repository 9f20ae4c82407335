//! Shared data model for the Manifesto world protocol.
//!
//! This crate provides:
//! - strong typed ids for worlds, proposals, decisions, edges, and actors
//! - the immutable `World`/`WorldEdge` lineage records and opaque `Snapshot`
//! - the mutable `Proposal` record and its status machine vocabulary
//! - authority bindings and policies (auto-approve, HITL, rules, tribunal)
//! - the closed governance event set emitted by the orchestrator
//! - content-address derivation over canonical JSON

pub mod authority;
pub mod decision;
pub mod event;
pub mod hash;
pub mod ids;
pub mod intent;
pub mod proposal;
pub mod snapshot;
pub mod world;

pub use authority::{
    ActorAuthorityBinding, AuthorityPolicy, AuthorityRef, PolicyRule, RuleEffect, ScopeGrant,
};
pub use decision::{DecisionRecord, Ruling};
pub use event::{ExecutionDisposition, SupersededReason, WorldEvent, WorldEventKind};
pub use ids::{ActorId, DecisionId, EdgeId, ProposalId, WorldId};
pub use intent::{intent_key, IntentError, IntentInstance, IntentOrigin};
pub use proposal::{Proposal, ProposalStatus};
pub use snapshot::{EffectRequirement, Snapshot};
pub use world::{World, WorldEdge};
