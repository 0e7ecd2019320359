//! Shared fixtures for the cross-crate tests: a two-alternative travel
//! definition, proof events shaped like agent webhooks, and an engine wired
//! to in-memory collaborators.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use vouch_core::{
    ConnectionId, ContactId, EngineConfig, PresentationDefinition, ProofEvent,
    SendPresentationRequest,
};
use vouch_decision::{
    ConfigGovernance, DecisionEngine, DefinitionSource, InMemoryRecordStore, RecordingAgent,
    StaticDefinitionSource,
};

pub const NOW_SECS: i64 = 1_700_000_000;
pub const ISSUER: &str = "IssuerDid123";
pub const LAB_SCHEMA: &str = "IssuerDid123:2:Lab_Result:1.0";
pub const VACCINATION_SCHEMA: &str = "IssuerDid123:2:Vaccination:1.0";
pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 86_400;

pub fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(NOW_SECS, 0).single().unwrap_or_default()
}

/// Lab result (group A) or vaccination (group B), either one suffices.
pub fn travel_definition_json() -> Value {
    json!({
        "presentation_definition": {
            "id": "trusted-traveler-v1",
            "submission_requirements": [{
                "name": "Health status",
                "from_nested": [
                    { "name": "Tested", "from": "A" },
                    { "name": "Vaccinated", "from": "B" }
                ]
            }],
            "input_descriptors": [
                {
                    "id": "lab",
                    "name": "Lab_Result",
                    "group": ["A"],
                    "schema": [{ "uri": LAB_SCHEMA }],
                    "constraints": { "fields": [
                        { "path": ["$.lab_result"], "filter": { "type": "string", "const": "Negative" } },
                        { "path": ["$.lab_specimen_collected_date"], "filter": { "exclusiveMinimum": "today:seconds:259200" } },
                        { "path": ["$.patient_surnames"] },
                        { "path": ["$.patient_given_names"] }
                    ]}
                },
                {
                    "id": "vaccination",
                    "name": "Vaccination",
                    "group": ["B"],
                    "schema": [{ "uri": VACCINATION_SCHEMA }],
                    "constraints": { "fields": [
                        { "path": ["$.vaccine_series_complete"], "filter": { "const": "true" } },
                        { "path": ["$.vaccine_administration_date"], "filter": { "exclusiveMaximum": "today:seconds:1209600" } },
                        { "path": ["$.vaccine_manufacturer_code"], "filter": { "type": "string", "pattern": "^(JSN|MOD|PFR|ASZ)$" } },
                        { "path": ["$.patient_surnames"] },
                        { "path": ["$.patient_given_names"] }
                    ]}
                }
            ]
        }
    })
}

pub fn travel_definition() -> PresentationDefinition {
    PresentationDefinition::from_value(travel_definition_json())
        .unwrap_or_else(|e| panic!("fixture definition invalid: {}", e))
}

/// Default engine config trusting [`ISSUER`].
pub fn engine_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.governance.trusted_issuers = vec![ISSUER.into()];
    config
}

/// A connection/contact pair already linked in the store.
pub struct Harness {
    pub engine: DecisionEngine,
    pub agent: Arc<RecordingAgent>,
    pub store: Arc<InMemoryRecordStore>,
    pub connection: ConnectionId,
    pub contact: ContactId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            engine_config(),
            Arc::new(StaticDefinitionSource::new(travel_definition())),
        )
    }

    pub fn with(config: EngineConfig, definitions: Arc<dyn DefinitionSource>) -> Self {
        let agent = Arc::new(RecordingAgent::new());
        let store = Arc::new(InMemoryRecordStore::new());
        let connection = ConnectionId::new("conn-1");
        let contact = ContactId::new("alice");
        store.link(connection.clone(), contact.clone());

        let engine = DecisionEngine::new(
            &config,
            agent.clone(),
            store.clone(),
            definitions,
            Arc::new(ConfigGovernance::new(config.governance.clone())),
        )
        .unwrap_or_else(|e| panic!("engine construction failed: {}", e));

        Self {
            engine,
            agent,
            store,
            connection,
            contact,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished, verified proof event for `connection`.
///
/// `revealed` go into a single attribute group,
/// `predicates` are listed by attribute name.
pub fn proof_event(
    connection: &ConnectionId,
    schema_id: &str,
    revealed: &[(&str, &str)],
    predicates: &[&str],
) -> ProofEvent {
    let values: Map<String, Value> = revealed
        .iter()
        .map(|(name, raw)| (name.to_string(), json!({ "raw": raw, "encoded": "0" })))
        .collect();
    let predicates: Map<String, Value> = predicates
        .iter()
        .map(|name| (name.to_string(), json!({ "sub_proof_index": 0 })))
        .collect();
    let issuer = schema_id.split(':').next().unwrap_or_default();

    let event = json!({
        "state": "verified",
        "verified": "true",
        "connection_id": connection.as_str(),
        "presentation_exchange_id": "pex-echo",
        "presentation": {
            "requested_proof": {
                "revealed_attr_groups": { "group-0": { "values": values } },
                "predicates": predicates,
                "self_attested_attrs": {}
            },
            "identifiers": [{
                "schema_id": schema_id,
                "cred_def_id": format!("{}:3:CL:42:default", issuer)
            }]
        }
    });
    serde_json::from_value(event).unwrap_or_else(|e| panic!("fixture event invalid: {}", e))
}

/// A lab result proof with the collection date revealed.
pub fn lab_event(connection: &ConnectionId, result: &str, collected_at: i64) -> ProofEvent {
    let collected = collected_at.to_string();
    proof_event(
        connection,
        LAB_SCHEMA,
        &[
            ("lab_result", result),
            ("lab_specimen_collected_date", collected.as_str()),
            ("patient_surnames", "Doe"),
            ("patient_given_names", "Jane"),
        ],
        &[],
    )
}

/// A vaccination proof whose administration date is proven by predicate.
pub fn vaccination_event(connection: &ConnectionId, complete: &str, manufacturer: &str) -> ProofEvent {
    proof_event(
        connection,
        VACCINATION_SCHEMA,
        &[
            ("vaccine_series_complete", complete),
            ("vaccine_manufacturer_code", manufacturer),
            ("patient_surnames", "Doe"),
            ("patient_given_names", "Jane"),
        ],
        &["vaccine_administration_date"],
    )
}

/// Answer a compiled request the way an honest holder would: every
/// requested attribute revealed from `values`, every predicate proven.
pub fn answer(request: &SendPresentationRequest, values: &BTreeMap<&str, &str>) -> ProofEvent {
    let body = &request.proof_request;
    let revealed: Vec<(&str, &str)> = body
        .requested_attributes
        .keys()
        .map(|name| (name.as_str(), values.get(name.as_str()).copied().unwrap_or("")))
        .collect();
    let predicates: Vec<&str> = body.requested_predicates.keys().map(String::as_str).collect();
    let schema = body
        .requested_attributes
        .values()
        .flat_map(|a| a.restrictions.iter())
        .map(|r| r.schema_id.as_str())
        .next()
        .unwrap_or(LAB_SCHEMA);
    proof_event(&request.connection_id, schema, &revealed, &predicates)
}
