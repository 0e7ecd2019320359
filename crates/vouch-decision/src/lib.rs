//! Vouch Decision — Turns proof events into verification decisions.
//!
//! Provides:
//! - Triage of agent proof events (state, verification verdict, participant trust)
//! - Descriptor evaluation against per-contact result records
//! - Pluggable business rules (lab result window, vaccination maturation, accepted values)
//! - Credential issuance attributes and self-attested identity records
//! - Proof request dispatch
//! - Collaborator ports with in-memory implementations

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod issuance;
pub mod locks;
pub mod memory;
pub mod ports;
pub mod rules;

pub use engine::{decide, Decision, DecisionEngine, RejectReason, Verdict};
pub use error::{AgentError, DecisionError, DefinitionFetchError, StoreError};
pub use issuance::{CredentialAttribute, CredentialOffer, Issuance, SelfAttestedIdentity};
pub use locks::{ContactGuard, ContactLocks};
pub use memory::{
    AgentEffect, ConfigGovernance, FileDefinitionSource, InMemoryRecordStore, RecordingAgent,
    StaticDefinitionSource,
};
pub use ports::{DefinitionSource, Governance, ProofAgent, RecordStore};
pub use rules::{
    AcceptedValuesRule, BusinessRule, LabResultRule, RuleOutcome, RuleSet, VaccinationRule,
};
