use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::hash;
use crate::ids::ActorId;

/// Structural problems with an intent instance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("intent body must be a JSON object")]
    BodyNotAnObject,

    #[error("intent body must carry a non-empty string `kind` field")]
    MissingKind,
}

/// Provenance of an intent: who issued it, with an optional trace handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentOrigin {
    pub actor: ActorId,
    #[serde(default)]
    pub trace: Option<String>,
}

/// A concrete request to transition state, bound to the actor that issued
/// it. `intent_key` is a deterministic hash of `(schema_hash, body)` and is
/// re-derived and checked at submission time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentInstance {
    pub body: Value,
    pub intent_key: String,
    pub origin: IntentOrigin,
    /// Scope the actor proposes for itself; authorities may narrow or
    /// replace it when approving.
    #[serde(default)]
    pub scope_proposal: Option<Value>,
}

/// Deterministic key for an intent body under a schema.
pub fn intent_key(schema_hash: &str, body: &Value) -> String {
    hash::hash_hex(
        hash::INTENT_DOMAIN,
        &json!({ "schema_hash": schema_hash, "body": body }),
    )
}

impl IntentInstance {
    pub fn new(schema_hash: &str, actor: ActorId, body: Value) -> Self {
        let intent_key = intent_key(schema_hash, &body);
        Self {
            body,
            intent_key,
            origin: IntentOrigin {
                actor,
                trace: None,
            },
            scope_proposal: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.origin.trace = Some(trace.into());
        self
    }

    pub fn with_scope_proposal(mut self, scope: Value) -> Self {
        self.scope_proposal = Some(scope);
        self
    }

    /// The intent's declared kind, when structurally valid.
    pub fn kind(&self) -> Option<&str> {
        self.body.get("kind").and_then(Value::as_str)
    }

    /// Structural validation: the body must be an object with a non-empty
    /// string `kind` field.
    pub fn validate(&self) -> Result<(), IntentError> {
        if !self.body.is_object() {
            return Err(IntentError::BodyNotAnObject);
        }
        match self.kind() {
            Some(kind) if !kind.is_empty() => Ok(()),
            _ => Err(IntentError::MissingKind),
        }
    }
}
