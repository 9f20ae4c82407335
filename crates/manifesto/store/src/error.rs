use thiserror::Error;

/// Errors returned by `WorldStore` implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Immutable entities may be created exactly once.
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    /// Update was attempted on an entity that was never saved.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("genesis world is already set")]
    GenesisAlreadySet,

    #[error("genesis world {id} has not been saved")]
    GenesisWorldMissing { id: String },
}

impl StoreError {
    pub fn already_exists(kind: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
