//! Collaborators the decision engine talks to. The engine owns none of
//! them: transport, persistence and governance live outside.

use async_trait::async_trait;

use vouch_core::{
    ConnectionId, ContactId, NoticeCode, PresentationDefinition, ProofResultRecord, SchemaId,
    SendPresentationRequest,
};

use crate::error::{AgentError, DefinitionFetchError, StoreError};
use crate::issuance::{CredentialOffer, SelfAttestedIdentity};

/// The holder-facing agent.
#[async_trait]
pub trait ProofAgent: Send + Sync {
    /// Send a proof request; returns the agent's exchange id.
    async fn request_proof(&self, request: SendPresentationRequest) -> Result<String, AgentError>;

    /// Issue a credential; returns the agent's receipt id.
    async fn issue_credential(&self, offer: CredentialOffer) -> Result<String, AgentError>;

    /// Send a machine-readable notice to the holder.
    async fn send_notice(&self, connection: &ConnectionId, code: NoticeCode) -> Result<(), AgentError>;
}

/// Contact and result persistence.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn contact_for_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Option<ContactId>, StoreError>;

    async fn load_results(&self, contact: &ContactId) -> Result<Option<ProofResultRecord>, StoreError>;

    async fn save_results(&self, contact: &ContactId, record: &ProofResultRecord) -> Result<(), StoreError>;

    async fn save_identity(
        &self,
        contact: &ContactId,
        identity: &SelfAttestedIdentity,
    ) -> Result<(), StoreError>;
}

/// Where the current presentation definition comes from.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn fetch(&self) -> Result<PresentationDefinition, DefinitionFetchError>;
}

/// Trust framework answers.
#[async_trait]
pub trait Governance: Send + Sync {
    /// Whether credentials of `schema_id` from `issuer_did` are accepted.
    async fn is_trusted_source(&self, schema_id: &SchemaId, issuer_did: &str) -> bool;

    /// Whether this issuer holds `privilege`.
    async fn has_privilege(&self, privilege: &str) -> bool;
}
