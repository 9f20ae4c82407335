//! World Protocol orchestrator.
//!
//! Independent actors propose changes to a shared, versioned application
//! state; every proposal passes an authority decision (auto-approve, human
//! in the loop, rule-based, or tribunal) and, only on approval, executes
//! into a new immutable, content-addressed world. Worlds form a branchable
//! lineage DAG; a branch switch advances the epoch and evicts proposals
//! still in the ingress stage.
//!
//! The public surface is [`ManifestoWorld`]; the composed parts
//! (`ActorRegistry`, `ProposalQueue`, `AuthorityEvaluator`, `WorldLineage`,
//! `IngressContext`) are exported for embedding and tests. Persistence goes
//! through the `manifesto-store` port; state computation through the
//! [`HostExecutor`] port.

pub mod authority;
pub mod error;
pub mod events;
pub mod executor;
pub mod ingress;
pub mod lineage;
pub mod protocol;
pub mod queue;
pub mod registry;

pub use authority::{AuthorityEvaluator, ConditionRegistry, Verdict};
pub use error::ProtocolError;
pub use events::{BufferingEventSink, NullEventSink, StoreEventSink, WorldEventSink};
pub use executor::{
    DefaultKeyPolicy, ExecutionContext, ExecutionKeyPolicy, ExecutionRun, ExecutorFailure,
    HostExecutor,
};
pub use ingress::IngressContext;
pub use lineage::WorldLineage;
pub use protocol::{ManifestoWorld, ProposalResult};
pub use queue::{ProposalQueue, TransitionExtras};
pub use registry::ActorRegistry;
