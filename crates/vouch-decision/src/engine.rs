//! The verification decision pipeline: triage of proof events, descriptor
//! evaluation against the contact's records, and the resulting effects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use vouch_core::{
    ConnectionId, ContactId, EngineConfig, ExchangeState, NoticeCode, PresentationDefinition,
    ProofEvent, ProofResultRecord, ReturnedProof, VerificationStatus,
};
use vouch_engine::{branches, validate, Branch};

use crate::error::DecisionError;
use crate::issuance::{CredentialAttribute, Issuance, SelfAttestedIdentity};
use crate::locks::ContactLocks;
use crate::ports::{DefinitionSource, Governance, ProofAgent, RecordStore};
use crate::rules::{RuleOutcome, RuleSet};

/// What the engine concluded from one proof event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Every requirement is satisfied; a credential was issued with these attributes.
    Verified { attributes: Vec<CredentialAttribute> },
    Rejected { reason: RejectReason },
    Inconclusive { reason: String },
    /// Identity data recorded from self-attested attributes. Not verified.
    SelfAttested { identity: SelfAttestedIdentity },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The agent reported that cryptographic verification failed.
    ProofNotVerified,
    /// The credential came from an issuer or schema governance does not trust.
    UntrustedSource { issuer_did: String, schema_id: String },
    /// The proof carries neither a credential identifier nor self-attested data.
    NoCredentialSource,
    /// A trusted credential with nothing revealed, only predicates.
    NoRevealedAttributes,
    /// The proof does not answer any descriptor of the definition.
    NoMatchingDescriptor,
    DescriptorFailed { descriptor: String, detail: String },
    /// A previously recorded failure leaves no way to satisfy the definition.
    RequirementsUnsatisfiable,
    PrivilegeDenied { privilege: String },
}

impl RejectReason {
    /// The notice a holder receives for this rejection.
    pub fn notice(&self) -> NoticeCode {
        match self {
            Self::PrivilegeDenied { .. } => NoticeCode::InvalidPrivileges,
            _ => NoticeCode::InvalidProof,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProofNotVerified => write!(f, "proof not verified"),
            Self::UntrustedSource {
                issuer_did,
                schema_id,
            } => write!(f, "untrusted source {} ({})", issuer_did, schema_id),
            Self::NoCredentialSource => write!(f, "no credential source"),
            Self::NoRevealedAttributes => write!(f, "no revealed attributes"),
            Self::NoMatchingDescriptor => write!(f, "proof matches no descriptor"),
            Self::DescriptorFailed { descriptor, detail } => {
                write!(f, "{} failed: {}", descriptor, detail)
            }
            Self::RequirementsUnsatisfiable => write!(f, "requirements unsatisfiable"),
            Self::PrivilegeDenied { privilege } => write!(f, "missing privilege {}", privilege),
        }
    }
}

/// Outcome of evaluating a credential proof against the definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All requirements hold; issuance may proceed.
    Satisfied,
    Rejected(RejectReason),
    /// Some descriptors are still outstanding.
    Pending(String),
}

/// Standing of a requirement, branch, or the whole definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standing {
    Satisfied,
    Failed,
    Pending,
}

fn branch_standing(branch: &Branch<'_>, record: &ProofResultRecord) -> Standing {
    if branch.descriptors.is_empty() {
        return Standing::Failed;
    }
    let results: Vec<Option<bool>> = branch
        .descriptors
        .iter()
        .map(|d| record.result(&d.name))
        .collect();
    if results.contains(&Some(false)) {
        Standing::Failed
    } else if results.iter().all(|r| *r == Some(true)) {
        Standing::Satisfied
    } else {
        Standing::Pending
    }
}

/// Requirements are conjunctive; branches of one requirement are alternatives.
fn definition_standing(branches: &[Branch<'_>], record: &ProofResultRecord) -> Standing {
    let requirements: BTreeSet<usize> = branches.iter().map(|b| b.requirement).collect();
    let mut overall = Standing::Satisfied;
    for requirement in requirements {
        let standings: Vec<Standing> = branches
            .iter()
            .filter(|b| b.requirement == requirement)
            .map(|b| branch_standing(b, record))
            .collect();
        let standing = if standings.contains(&Standing::Satisfied) {
            Standing::Satisfied
        } else if standings.iter().all(|s| *s == Standing::Failed) {
            Standing::Failed
        } else {
            Standing::Pending
        };
        match standing {
            Standing::Failed => return Standing::Failed,
            Standing::Pending => overall = Standing::Pending,
            Standing::Satisfied => {}
        }
    }
    overall
}

/// Evaluate a credential proof and update the contact's record in place.
///
/// Descriptors are visited in branch order. A descriptor the proof does not
/// answer (field-set mismatch) is skipped and its entry left untouched. A
/// matched descriptor is validated, then checked against its business
/// rules, and its entry replaced. The first failure stops evaluation.
pub fn decide(
    definition: &PresentationDefinition,
    rules: &RuleSet,
    record: &mut ProofResultRecord,
    proof: &ReturnedProof,
    now: DateTime<Utc>,
) -> Verdict {
    record.align_definition(definition.id.as_deref());
    let branches = branches(definition);

    let mut visited = BTreeSet::new();
    let mut matched = false;
    for descriptor in branches.iter().flat_map(|b| b.descriptors.iter()) {
        if !visited.insert(descriptor.name.as_str()) {
            continue;
        }
        let outcome = validate(proof, descriptor);
        if outcome.is_mismatch() {
            continue;
        }
        matched = true;

        let (passed, detail) = if !outcome.passed {
            (false, outcome.failure.as_ref().map(|f| format!("{:?}", f)).unwrap_or_default())
        } else {
            match rules.check(&descriptor.name, proof, now) {
                RuleOutcome::Passed => (true, String::new()),
                RuleOutcome::Failed(reason) => (false, reason),
            }
        };
        record.upsert(&descriptor.name, Some(passed), outcome.snapshot);
        tracing::info!(descriptor = %descriptor.name, passed, "descriptor evaluated");

        if !passed {
            if definition_standing(&branches, record) == Standing::Failed {
                record.status = VerificationStatus::Rejected;
                return Verdict::Rejected(RejectReason::DescriptorFailed {
                    descriptor: descriptor.name.clone(),
                    detail,
                });
            }
            return Verdict::Pending(format!(
                "{} failed; alternatives remain",
                descriptor.name
            ));
        }
    }

    if !matched {
        return Verdict::Rejected(RejectReason::NoMatchingDescriptor);
    }

    match definition_standing(&branches, record) {
        Standing::Satisfied => Verdict::Satisfied,
        Standing::Failed => {
            record.status = VerificationStatus::Rejected;
            Verdict::Rejected(RejectReason::RequirementsUnsatisfiable)
        }
        Standing::Pending => Verdict::Pending("awaiting remaining descriptors".into()),
    }
}

/// Runs proof events through triage, evaluation and effects.
pub struct DecisionEngine {
    pub(crate) agent: Arc<dyn ProofAgent>,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) definitions: Arc<dyn DefinitionSource>,
    governance: Arc<dyn Governance>,
    rules: RuleSet,
    issuance: Issuance,
    required_privilege: String,
    pub(crate) locks: ContactLocks,
}

impl DecisionEngine {
    pub fn new(
        config: &EngineConfig,
        agent: Arc<dyn ProofAgent>,
        store: Arc<dyn RecordStore>,
        definitions: Arc<dyn DefinitionSource>,
        governance: Arc<dyn Governance>,
    ) -> Result<Self, DecisionError> {
        Ok(Self {
            agent,
            store,
            definitions,
            governance,
            rules: RuleSet::from_config(&config.rules),
            issuance: Issuance::new(
                config.issuance.clone(),
                config.governance.applied_label(),
            )?,
            required_privilege: config.governance.required_privilege.clone(),
            locks: ContactLocks::new(),
        })
    }

    /// Replace the configured business rules.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub async fn process(&self, event: &ProofEvent) -> Result<Decision, DecisionError> {
        self.process_at(event, Utc::now()).await
    }

    pub async fn process_at(
        &self,
        event: &ProofEvent,
        now: DateTime<Utc>,
    ) -> Result<Decision, DecisionError> {
        let connection = &event.connection_id;

        let Some(state) = event.state.as_deref() else {
            tracing::warn!(connection = %connection, "proof event without state");
            self.notify(connection, NoticeCode::Unverified).await;
            return Ok(Decision::Inconclusive {
                reason: "exchange state missing".into(),
            });
        };
        if state.parse::<ExchangeState>().ok() != Some(ExchangeState::Verified) {
            tracing::debug!(connection = %connection, state, "exchange not finished");
            return Ok(Decision::Inconclusive {
                reason: format!("exchange in state {}", state),
            });
        }
        if event.verified != Some(true) {
            return self.reject(connection, RejectReason::ProofNotVerified).await;
        }

        let proof = ReturnedProof::from_event(event);
        let trusted = match event.primary_identifier() {
            Some(id) => {
                let trusted = self
                    .governance
                    .is_trusted_source(&id.schema_id, id.issuer_did())
                    .await;
                tracing::debug!(issuer = id.issuer_did(), schema = %id.schema_id, trusted, "participant validation");
                Some((id, trusted))
            }
            None => None,
        };

        match trusted {
            Some((_, true)) if !proof.revealed.is_empty() => {
                self.process_credential(connection, &proof, now).await
            }
            _ if event.self_attested_attrs().is_some() => {
                self.process_self_attested(connection, event).await
            }
            Some((_, true)) => self.reject(connection, RejectReason::NoRevealedAttributes).await,
            Some((id, _)) => {
                let reason = RejectReason::UntrustedSource {
                    issuer_did: id.issuer_did().to_string(),
                    schema_id: id.schema_id.to_string(),
                };
                self.reject(connection, reason).await
            }
            None => self.reject(connection, RejectReason::NoCredentialSource).await,
        }
    }

    async fn process_credential(
        &self,
        connection: &ConnectionId,
        proof: &ReturnedProof,
        now: DateTime<Utc>,
    ) -> Result<Decision, DecisionError> {
        let definition = self.definitions.fetch().await?;
        let contact = self.contact(connection).await?;

        let _guard = self.locks.lock(&contact).await;
        let mut record = self
            .store
            .load_results(&contact)
            .await?
            .unwrap_or_else(|| ProofResultRecord::new(definition.id.clone()));

        let verdict = decide(&definition, &self.rules, &mut record, proof, now);
        tracing::info!(contact = %contact, verdict = ?verdict, "credential proof evaluated");

        let decision = match verdict {
            Verdict::Pending(reason) => Decision::Inconclusive { reason },
            Verdict::Rejected(reason) => Decision::Rejected { reason },
            Verdict::Satisfied => {
                if self.governance.has_privilege(&self.required_privilege).await {
                    record.status = VerificationStatus::Verified;
                    let attributes = self.issuance.attributes(&record.accepted_attributes(), now);
                    Decision::Verified { attributes }
                } else {
                    Decision::Rejected {
                        reason: RejectReason::PrivilegeDenied {
                            privilege: self.required_privilege.clone(),
                        },
                    }
                }
            }
        };
        self.store.save_results(&contact, &record).await?;

        match &decision {
            Decision::Verified { attributes } => {
                let offer = self.issuance.offer(connection.clone(), attributes.clone());
                match self.agent.issue_credential(offer).await {
                    Ok(receipt) => {
                        tracing::info!(contact = %contact, receipt = %receipt, "credential issued")
                    }
                    Err(e) => tracing::error!(contact = %contact, error = %e, "credential issuance failed"),
                }
            }
            Decision::Rejected { reason } => self.notify(connection, reason.notice()).await,
            _ => {}
        }
        Ok(decision)
    }

    async fn process_self_attested(
        &self,
        connection: &ConnectionId,
        event: &ProofEvent,
    ) -> Result<Decision, DecisionError> {
        let contact = self.contact(connection).await?;
        let identity = event
            .self_attested_attrs()
            .map(SelfAttestedIdentity::from_attributes)
            .unwrap_or_default();

        let _guard = self.locks.lock(&contact).await;
        self.store.save_identity(&contact, &identity).await?;
        tracing::info!(
            contact = %contact,
            demographics = identity.demographics.len(),
            passport = identity.passport.len(),
            "self-attested identity recorded"
        );
        Ok(Decision::SelfAttested { identity })
    }

    async fn reject(
        &self,
        connection: &ConnectionId,
        reason: RejectReason,
    ) -> Result<Decision, DecisionError> {
        tracing::warn!(connection = %connection, reason = %reason, "proof rejected");
        self.notify(connection, reason.notice()).await;
        Ok(Decision::Rejected { reason })
    }

    pub(crate) async fn contact(&self, connection: &ConnectionId) -> Result<ContactId, DecisionError> {
        self.store
            .contact_for_connection(connection)
            .await?
            .ok_or_else(|| DecisionError::UnknownConnection(connection.clone()))
    }

    async fn notify(&self, connection: &ConnectionId, code: NoticeCode) {
        if let Err(e) = self.agent.send_notice(connection, code).await {
            tracing::error!(connection = %connection, code = %code, error = %e, "failed to send notice");
        }
    }
}
