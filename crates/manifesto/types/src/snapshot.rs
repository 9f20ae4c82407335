use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hash;

/// An effect the state engine still has to satisfy before the snapshot state
/// is settled. A snapshot with outstanding requirements cannot be branched
/// from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRequirement {
    pub kind: String,
    pub payload: Value,
}

/// Opaque state payload associated 1:1 with a world. The orchestrator never
/// interprets `state`; it only inspects `pending_requirements` and
/// `last_error` to derive outcomes and validate base worlds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: Value,
    #[serde(default)]
    pub pending_requirements: Vec<EffectRequirement>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Snapshot {
    pub fn new(state: Value) -> Self {
        Self {
            state,
            pending_requirements: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_pending_requirement(mut self, kind: impl Into<String>, payload: Value) -> Self {
        self.pending_requirements.push(EffectRequirement {
            kind: kind.into(),
            payload,
        });
        self
    }

    pub fn with_last_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(message.into());
        self
    }

    /// A snapshot mid-effect has outstanding requirements and cannot serve
    /// as a base world.
    pub fn is_mid_effect(&self) -> bool {
        !self.pending_requirements.is_empty()
    }

    /// Content hash over the full snapshot payload.
    pub fn content_hash(&self) -> String {
        let requirements: Vec<Value> = self
            .pending_requirements
            .iter()
            .map(|r| json!({ "kind": r.kind, "payload": r.payload }))
            .collect();
        hash::hash_hex(
            hash::SNAPSHOT_DOMAIN,
            &json!({
                "state": self.state,
                "pending_requirements": requirements,
                "last_error": self.last_error,
            }),
        )
    }
}
