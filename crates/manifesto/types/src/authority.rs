use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ActorId;

/// Reference to the decision-making entity bound to an actor, derived from
/// the policy mode at registration time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorityRef(pub String);

impl std::fmt::Display for AuthorityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aut:{}", self.0)
    }
}

/// Effect a policy rule applies when it matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleEffect {
    Approve,
    #[default]
    Reject,
}

/// Scope carried by an approval. `Unspecified` is distinct from
/// `Unrestricted`: the former defers to the proposal's own scope proposal,
/// the latter explicitly grants no restriction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeGrant {
    #[default]
    Unspecified,
    Unrestricted,
    Scoped(Value),
}

impl ScopeGrant {
    /// Substitute the proposal's own scope proposal for an unspecified
    /// grant, preserving an explicit `Unrestricted` as no restriction.
    pub fn resolve(self, scope_proposal: &Option<Value>) -> Option<Value> {
        match self {
            Self::Unspecified => scope_proposal.clone(),
            Self::Unrestricted => None,
            Self::Scoped(scope) => Some(scope),
        }
    }
}

/// A single named rule in a `policy_rules` authority. The rule matches when
/// every named condition evaluates true for the proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    pub conditions: Vec<String>,
    pub effect: RuleEffect,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub scope: ScopeGrant,
}

/// How decisions are made for an actor's proposals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthorityPolicy {
    /// Every proposal is approved synchronously.
    AutoApprove,
    /// A human delegate decides out-of-band.
    Hitl { delegate: ActorId },
    /// Deterministic rule evaluation against named predicates.
    PolicyRules {
        rules: Vec<PolicyRule>,
        #[serde(default)]
        default_effect: RuleEffect,
    },
    /// A member panel decides out-of-band; one consolidated decision.
    Tribunal { members: Vec<ActorId>, quorum: usize },
}

impl AuthorityPolicy {
    /// Blocking policies suspend the proposal until an external decision.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Hitl { .. } | Self::Tribunal { .. })
    }

    /// Derive the authority reference recorded in the binding.
    pub fn authority_ref(&self) -> AuthorityRef {
        match self {
            Self::AutoApprove => AuthorityRef("auto".into()),
            Self::Hitl { delegate } => AuthorityRef(format!("hitl:{}", delegate.0)),
            Self::PolicyRules { .. } => AuthorityRef("policy".into()),
            Self::Tribunal { members, quorum } => {
                AuthorityRef(format!("tribunal:{}of{}", quorum, members.len()))
            }
        }
    }
}

/// Binding between an actor and its authority, keyed by actor id and
/// replaced only via explicit re-registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorAuthorityBinding {
    pub actor: ActorId,
    pub authority: AuthorityRef,
    pub policy: AuthorityPolicy,
}

impl ActorAuthorityBinding {
    pub fn new(actor: ActorId, policy: AuthorityPolicy) -> Self {
        let authority = policy.authority_ref();
        Self {
            actor,
            authority,
            policy,
        }
    }
}
