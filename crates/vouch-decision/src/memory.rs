//! In-process implementations of the collaborator ports, used by the CLI
//! and by tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use vouch_core::{
    ConnectionId, ContactId, GovernanceConfig, NoticeCode, PresentationDefinition,
    ProofResultRecord, SchemaId, SendPresentationRequest,
};

use crate::error::{AgentError, DefinitionFetchError, StoreError};
use crate::issuance::{CredentialOffer, SelfAttestedIdentity};
use crate::ports::{DefinitionSource, Governance, ProofAgent, RecordStore};

/// Contact links, result records and identities held in memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    contacts: DashMap<ConnectionId, ContactId>,
    results: DashMap<ContactId, ProofResultRecord>,
    identities: DashMap<ContactId, SelfAttestedIdentity>,
    offline: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from previously exported records.
    pub fn with_records(records: BTreeMap<ContactId, ProofResultRecord>) -> Self {
        let store = Self::new();
        for (contact, record) in records {
            store.results.insert(contact, record);
        }
        store
    }

    /// Associate a connection with a contact.
    pub fn link(&self, connection: ConnectionId, contact: ContactId) {
        self.contacts.insert(connection, contact);
    }

    /// All result records, sorted by contact.
    pub fn export_records(&self) -> BTreeMap<ContactId, ProofResultRecord> {
        self.results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn identity(&self, contact: &ContactId) -> Option<SelfAttestedIdentity> {
        self.identities.get(contact).map(|i| i.clone())
    }

    pub fn record(&self, contact: &ContactId) -> Option<ProofResultRecord> {
        self.results.get(contact).map(|r| r.clone())
    }

    /// While offline every port call fails with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn available(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn contact_for_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Option<ContactId>, StoreError> {
        self.available()?;
        Ok(self.contacts.get(connection).map(|c| c.clone()))
    }

    async fn load_results(&self, contact: &ContactId) -> Result<Option<ProofResultRecord>, StoreError> {
        self.available()?;
        Ok(self.record(contact))
    }

    async fn save_results(&self, contact: &ContactId, record: &ProofResultRecord) -> Result<(), StoreError> {
        self.available()?;
        self.results.insert(contact.clone(), record.clone());
        Ok(())
    }

    async fn save_identity(
        &self,
        contact: &ContactId,
        identity: &SelfAttestedIdentity,
    ) -> Result<(), StoreError> {
        self.available()?;
        self.identities.insert(contact.clone(), identity.clone());
        Ok(())
    }
}

/// A definition held in memory. `None` behaves like an unreachable source.
pub struct StaticDefinitionSource {
    definition: Option<PresentationDefinition>,
}

impl StaticDefinitionSource {
    pub fn new(definition: PresentationDefinition) -> Self {
        Self {
            definition: Some(definition),
        }
    }

    pub fn unavailable() -> Self {
        Self { definition: None }
    }
}

#[async_trait]
impl DefinitionSource for StaticDefinitionSource {
    async fn fetch(&self) -> Result<PresentationDefinition, DefinitionFetchError> {
        self.definition
            .clone()
            .ok_or_else(|| DefinitionFetchError::Unavailable("no definition configured".into()))
    }
}

/// A definition read from a JSON file on every fetch.
pub struct FileDefinitionSource {
    path: PathBuf,
}

impl FileDefinitionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DefinitionSource for FileDefinitionSource {
    async fn fetch(&self) -> Result<PresentationDefinition, DefinitionFetchError> {
        let json = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DefinitionFetchError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(PresentationDefinition::from_json(&json)?)
    }
}

/// Governance answers taken from static configuration.
pub struct ConfigGovernance {
    config: GovernanceConfig,
}

impl ConfigGovernance {
    pub fn new(config: GovernanceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Governance for ConfigGovernance {
    async fn is_trusted_source(&self, schema_id: &SchemaId, issuer_did: &str) -> bool {
        let issuer_ok = self.config.trusted_issuers.iter().any(|i| i == issuer_did);
        let schema_ok = self.config.trusted_schemas.is_empty()
            || self
                .config
                .trusted_schemas
                .iter()
                .any(|s| s == schema_id.as_str());
        issuer_ok && schema_ok
    }

    async fn has_privilege(&self, privilege: &str) -> bool {
        self.config.privileges.iter().any(|p| p == privilege)
    }
}

/// A side effect the engine asked the agent to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum AgentEffect {
    ProofRequested { request: SendPresentationRequest },
    CredentialIssued { offer: CredentialOffer },
    Notice { connection_id: ConnectionId, code: NoticeCode },
}

/// Records every call instead of talking to a real agent.
#[derive(Default)]
pub struct RecordingAgent {
    effects: Mutex<Vec<AgentEffect>>,
    next_id: AtomicU64,
    failure: Option<String>,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// An agent whose every call fails after being recorded.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Default::default()
        }
    }

    pub async fn effects(&self) -> Vec<AgentEffect> {
        self.effects.lock().await.clone()
    }

    pub async fn notices(&self) -> Vec<NoticeCode> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                AgentEffect::Notice { code, .. } => Some(*code),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, effect: AgentEffect) -> Result<String, AgentError> {
        self.effects.lock().await.push(effect);
        match &self.failure {
            Some(reason) => Err(AgentError::Transport(reason.clone())),
            None => Ok(format!("pex-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)),
        }
    }
}

#[async_trait]
impl ProofAgent for RecordingAgent {
    async fn request_proof(&self, request: SendPresentationRequest) -> Result<String, AgentError> {
        self.record(AgentEffect::ProofRequested { request }).await
    }

    async fn issue_credential(&self, offer: CredentialOffer) -> Result<String, AgentError> {
        self.record(AgentEffect::CredentialIssued { offer }).await
    }

    async fn send_notice(&self, connection: &ConnectionId, code: NoticeCode) -> Result<(), AgentError> {
        self.record(AgentEffect::Notice {
            connection_id: connection.clone(),
            code,
        })
        .await
        .map(|_| ())
    }
}
