//! Subcommand implementations.

use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use vouch_core::{ConnectionId, ContactId, PresentationDefinition, ProofEvent, ProofResultRecord, ReturnedProof};
use vouch_decision::{
    AgentEffect, ConfigGovernance, Decision, DecisionEngine, FileDefinitionSource,
    InMemoryRecordStore, RecordingAgent,
};
use vouch_engine::{compile_definition, eligible, identity_request, validate, ValidationOutcome};

use crate::config::VouchConfig;

/// Result of `process` and `request`: what was decided and what the agent
/// would have been asked to do.
#[derive(Debug, Serialize)]
pub struct ProcessReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exchanges: Vec<String>,
    pub effects: Vec<AgentEffect>,
}

pub fn load_definition(path: &Path) -> anyhow::Result<PresentationDefinition> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading definition {}", path.display()))?;
    PresentationDefinition::from_json(&json)
        .with_context(|| format!("parsing definition {}", path.display()))
}

pub fn load_event(path: &Path) -> anyhow::Result<ProofEvent> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading proof event {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing proof event {}", path.display()))
}

pub fn load_records(path: Option<&Path>) -> anyhow::Result<BTreeMap<ContactId, ProofResultRecord>> {
    match path {
        Some(p) if p.exists() => {
            let json = std::fs::read_to_string(p)
                .with_context(|| format!("reading records {}", p.display()))?;
            Ok(serde_json::from_str(&json)?)
        }
        _ => Ok(BTreeMap::new()),
    }
}

pub fn save_records(
    path: &Path,
    records: &BTreeMap<ContactId, ProofResultRecord>,
) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(records)?)
        .with_context(|| format!("writing records {}", path.display()))
}

/// Outbound send-request bodies for every eligible descriptor.
pub fn compile(
    config: &VouchConfig,
    connection: &ConnectionId,
    with_identity: bool,
) -> anyhow::Result<Vec<serde_json::Value>> {
    let definition = load_definition(&config.definition.path)?;
    let mut specs = compile_definition(&definition, connection, chrono::Utc::now().timestamp());
    if with_identity {
        specs.push(identity_request(connection));
    }
    tracing::info!(connection = %connection, requests = specs.len(), "compiled proof requests");
    specs
        .iter()
        .map(|spec| -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::to_value(spec.to_send_request(rand::random::<u64>()))?)
        })
        .collect()
}

/// Validation outcome of a proof event against every eligible descriptor.
pub fn validate_event(
    config: &VouchConfig,
    event_path: &Path,
) -> anyhow::Result<BTreeMap<String, ValidationOutcome>> {
    let definition = load_definition(&config.definition.path)?;
    let event = load_event(event_path)?;
    let proof = ReturnedProof::from_event(&event);
    Ok(eligible(&definition)
        .into_iter()
        .map(|d| (d.name.clone(), validate(&proof, d)))
        .collect())
}

fn build_engine(
    config: &VouchConfig,
    store: Arc<InMemoryRecordStore>,
    agent: Arc<RecordingAgent>,
) -> anyhow::Result<DecisionEngine> {
    Ok(DecisionEngine::new(
        &config.engine,
        agent,
        store,
        Arc::new(FileDefinitionSource::new(config.definition.path.clone())),
        Arc::new(ConfigGovernance::new(config.engine.governance.clone())),
    )?)
}

/// Run a proof event through the decision engine.
pub async fn process(
    config: &VouchConfig,
    event_path: &Path,
    contact: Option<ContactId>,
    records_path: Option<&Path>,
) -> anyhow::Result<ProcessReport> {
    let event = load_event(event_path)?;
    let store = Arc::new(InMemoryRecordStore::with_records(load_records(records_path)?));
    let contact = contact.unwrap_or_else(|| ContactId::new(event.connection_id.as_str()));
    store.link(event.connection_id.clone(), contact);

    let agent = Arc::new(RecordingAgent::new());
    let engine = build_engine(config, store.clone(), agent.clone())?;
    let decision = engine.process(&event).await?;

    if let Some(path) = records_path {
        save_records(path, &store.export_records())?;
    }
    Ok(ProcessReport {
        decision: Some(decision),
        exchanges: Vec::new(),
        effects: agent.effects().await,
    })
}

/// Dispatch every proof request for a connection, marking descriptors pending.
pub async fn request(
    config: &VouchConfig,
    connection: ConnectionId,
    contact: Option<ContactId>,
    records_path: Option<&Path>,
) -> anyhow::Result<ProcessReport> {
    let store = Arc::new(InMemoryRecordStore::with_records(load_records(records_path)?));
    let contact = contact.unwrap_or_else(|| ContactId::new(connection.as_str()));
    store.link(connection.clone(), contact);

    let agent = Arc::new(RecordingAgent::new());
    let engine = build_engine(config, store.clone(), agent.clone())?;
    let exchanges = engine.request_presentations(&connection).await?;

    if let Some(path) = records_path {
        save_records(path, &store.export_records())?;
    }
    Ok(ProcessReport {
        decision: None,
        exchanges,
        effects: agent.effects().await,
    })
}
