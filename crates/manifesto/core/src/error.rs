use manifesto_store::StoreError;
use thiserror::Error;

/// Typed domain errors of the world protocol, each with a stable code.
///
/// Preconditions (unknown actor/world/proposal, malformed intent, duplicate
/// genesis) are returned as `Err` before any state mutation. Epoch staleness
/// and execution-time failures are carried inside `ProposalResult` instead:
/// they are expected outcomes of concurrent operation, not caller misuse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("actor {actor} is not registered")]
    ActorNotRegistered { actor: String },

    #[error("world {world} not found")]
    WorldNotFound { world: String },

    #[error("a genesis world already exists")]
    GenesisAlreadyExists,

    #[error("invalid base world {world}: {reason}")]
    InvalidBaseWorld { world: String, reason: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("proposal {proposal} not found")]
    ProposalNotFound { proposal: String },

    #[error("proposal {proposal} has no pending HITL decision")]
    HitlNotPending { proposal: String },

    #[error("no executor is configured")]
    ExecutorNotConfigured,

    #[error("snapshot for world {world} not found")]
    SnapshotNotFound { world: String },

    #[error("executor failed: {summary}")]
    ExecutorError { summary: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl ProtocolError {
    /// Stable machine-readable code for the taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ActorNotRegistered { .. } => "ACTOR_NOT_REGISTERED",
            Self::WorldNotFound { .. } => "WORLD_NOT_FOUND",
            Self::GenesisAlreadyExists => "GENESIS_ALREADY_EXISTS",
            Self::InvalidBaseWorld { .. } => "INVALID_BASE_WORLD",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::ProposalNotFound { .. } => "PROPOSAL_NOT_FOUND",
            Self::HitlNotPending { .. } => "HITL_NOT_PENDING",
            Self::ExecutorNotConfigured => "EXECUTOR_NOT_CONFIGURED",
            Self::SnapshotNotFound { .. } => "SNAPSHOT_NOT_FOUND",
            Self::ExecutorError { .. } => "EXECUTOR_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for ProtocolError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { kind: "world", id } => Self::WorldNotFound { world: id },
            StoreError::NotFound { kind: "proposal", id } => Self::ProposalNotFound { proposal: id },
            StoreError::GenesisAlreadySet => Self::GenesisAlreadyExists,
            other => Self::Internal {
                reason: other.to_string(),
            },
        }
    }
}
