use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use manifesto_types::{
    ActorAuthorityBinding, AuthorityPolicy, AuthorityRef, Proposal, ProposalId, RuleEffect, Ruling,
    ScopeGrant,
};

use crate::error::ProtocolError;

/// Named predicate evaluated against a proposal by `policy_rules`
/// authorities.
pub type ConditionFn = Arc<dyn Fn(&Proposal) -> bool + Send + Sync>;

/// Pluggable registry of named condition evaluators.
#[derive(Clone, Default)]
pub struct ConditionRegistry {
    conditions: Arc<RwLock<HashMap<String, ConditionFn>>>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        condition: impl Fn(&Proposal) -> bool + Send + Sync + 'static,
    ) {
        self.conditions
            .write()
            .expect("condition registry lock poisoned")
            .insert(name.into(), Arc::new(condition));
    }

    /// Evaluate a named condition; `None` when no evaluator is registered
    /// under that name.
    pub fn evaluate(&self, name: &str, proposal: &Proposal) -> Option<bool> {
        let conditions = self
            .conditions
            .read()
            .expect("condition registry lock poisoned");
        conditions.get(name).map(|condition| condition(proposal))
    }
}

/// Result of an authority evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approved {
        scope: ScopeGrant,
        reason: Option<String>,
    },
    Rejected {
        reason: Option<String>,
    },
    /// Blocking authorities suspend here; the decision arrives later via
    /// `resolve`.
    Pending,
}

/// Evaluates proposals against their actor's authority binding.
///
/// Non-blocking modes (`auto_approve`, `policy_rules`) decide synchronously
/// and deterministically. Blocking modes (`hitl`, `tribunal`) register an
/// outstanding decision slot keyed by proposal id and return
/// [`Verdict::Pending`]; the out-of-band decision is delivered through
/// [`AuthorityEvaluator::resolve`], exactly once per slot.
pub struct AuthorityEvaluator {
    conditions: ConditionRegistry,
    pending: Mutex<HashMap<ProposalId, AuthorityRef>>,
}

impl AuthorityEvaluator {
    pub fn new(conditions: ConditionRegistry) -> Self {
        Self {
            conditions,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn conditions(&self) -> &ConditionRegistry {
        &self.conditions
    }

    pub fn evaluate(&self, proposal: &Proposal, binding: &ActorAuthorityBinding) -> Verdict {
        match &binding.policy {
            AuthorityPolicy::AutoApprove => Verdict::Approved {
                scope: ScopeGrant::Unspecified,
                reason: None,
            },
            AuthorityPolicy::PolicyRules {
                rules,
                default_effect,
            } => self.evaluate_rules(proposal, rules, *default_effect),
            AuthorityPolicy::Hitl { .. } | AuthorityPolicy::Tribunal { .. } => {
                self.pending_slots()
                    .insert(proposal.proposal_id.clone(), binding.authority.clone());
                debug!(
                    proposal = %proposal.proposal_id,
                    authority = %binding.authority,
                    "decision pending out-of-band"
                );
                Verdict::Pending
            }
        }
    }

    /// Deliver an out-of-band decision for a pending proposal. The slot is
    /// consumed; a second delivery fails with `HITL_NOT_PENDING`.
    pub fn resolve(
        &self,
        proposal_id: &ProposalId,
        ruling: Ruling,
        reasoning: Option<String>,
        scope: ScopeGrant,
    ) -> Result<Verdict, ProtocolError> {
        let slot = self.pending_slots().remove(proposal_id);
        if slot.is_none() {
            return Err(ProtocolError::HitlNotPending {
                proposal: proposal_id.to_string(),
            });
        }
        Ok(match ruling {
            Ruling::Approved => Verdict::Approved {
                scope,
                reason: reasoning,
            },
            Ruling::Rejected => Verdict::Rejected { reason: reasoning },
        })
    }

    pub fn is_pending(&self, proposal_id: &ProposalId) -> bool {
        self.pending_slots().contains_key(proposal_id)
    }

    /// Drop the slot for an evicted proposal, if one exists.
    pub fn discard_pending(&self, proposal_id: &ProposalId) -> bool {
        self.pending_slots().remove(proposal_id).is_some()
    }

    fn evaluate_rules(
        &self,
        proposal: &Proposal,
        rules: &[manifesto_types::PolicyRule],
        default_effect: RuleEffect,
    ) -> Verdict {
        for rule in rules {
            let mut matched = true;
            for condition in &rule.conditions {
                match self.conditions.evaluate(condition, proposal) {
                    Some(true) => {}
                    Some(false) => {
                        matched = false;
                        break;
                    }
                    None => {
                        warn!(
                            rule = %rule.name,
                            condition = %condition,
                            "no evaluator registered for condition; rule does not match"
                        );
                        matched = false;
                        break;
                    }
                }
            }
            if !matched {
                continue;
            }
            return match rule.effect {
                RuleEffect::Approve => Verdict::Approved {
                    scope: rule.scope.clone(),
                    reason: rule.reason.clone(),
                },
                RuleEffect::Reject => Verdict::Rejected {
                    reason: rule
                        .reason
                        .clone()
                        .or_else(|| Some(format!("rejected by rule {}", rule.name))),
                },
            };
        }
        match default_effect {
            RuleEffect::Approve => Verdict::Approved {
                scope: ScopeGrant::Unspecified,
                reason: None,
            },
            RuleEffect::Reject => Verdict::Rejected {
                reason: Some("no policy rule matched".into()),
            },
        }
    }

    fn pending_slots(&self) -> std::sync::MutexGuard<'_, HashMap<ProposalId, AuthorityRef>> {
        self.pending.lock().expect("pending decision lock poisoned")
    }
}

impl Default for AuthorityEvaluator {
    fn default() -> Self {
        Self::new(ConditionRegistry::new())
    }
}
