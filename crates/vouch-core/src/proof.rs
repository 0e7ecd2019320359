//! Proof events delivered by the holder's agent, and the normalized view of
//! a returned proof the validator works on.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ConnectionId, SchemaId};

/// A presentation-exchange event as delivered by the agent webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofEvent {
    /// `None` when the agent could not process the exchange at all.
    #[serde(default)]
    pub state: Option<String>,
    /// Cryptographic verification verdict. Agents send it as a bool or as a
    /// `"true"` / `"false"` string.
    #[serde(default, deserialize_with = "deserialize_verdict")]
    pub verified: Option<bool>,
    pub connection_id: ConnectionId,
    #[serde(default)]
    pub presentation_exchange_id: Option<String>,
    #[serde(default)]
    pub presentation: Option<Presentation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub requested_proof: RequestedProof,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
}

/// Credential provenance attached to a presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub cred_def_id: String,
    pub schema_id: SchemaId,
}

impl Identifier {
    /// The credential issuer's DID: the first `:` segment of the
    /// credential definition id.
    pub fn issuer_did(&self) -> &str {
        self.cred_def_id.split(':').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttr>,
    #[serde(default)]
    pub revealed_attr_groups: BTreeMap<String, RevealedAttrGroup>,
    #[serde(default)]
    pub predicates: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub self_attested_attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealedAttr {
    pub raw: String,
    #[serde(default)]
    pub encoded: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RevealedAttrGroup {
    #[serde(default)]
    pub values: BTreeMap<String, RevealedAttr>,
}

fn deserialize_verdict<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Verdict {
        Bool(bool),
        Text(String),
    }

    match Option::<Verdict>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Verdict::Bool(b)) => Ok(Some(b)),
        Some(Verdict::Text(s)) => match s.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "invalid verified value `{}`",
                other
            ))),
        },
    }
}

impl ProofEvent {
    /// The first identifier of the presentation, if any.
    pub fn primary_identifier(&self) -> Option<&Identifier> {
        self.presentation.as_ref()?.identifiers.first()
    }

    pub fn self_attested_attrs(&self) -> Option<&BTreeMap<String, String>> {
        self.presentation
            .as_ref()
            .map(|p| &p.requested_proof.self_attested_attrs)
            .filter(|attrs| !attrs.is_empty())
    }
}

/// What a holder actually revealed, flattened for validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnedProof {
    /// Revealed attribute name → raw value, merged across all groups.
    pub revealed: BTreeMap<String, String>,
    /// Names of predicates the holder satisfied.
    pub predicates: BTreeSet<String>,
    pub self_attested: BTreeMap<String, String>,
    pub verified: Option<bool>,
    pub state: Option<String>,
}

impl ReturnedProof {
    /// Flatten an agent event. Single revealed attributes and every
    /// revealed group contribute to `revealed`; on a key collision the
    /// single attribute wins.
    pub fn from_event(event: &ProofEvent) -> Self {
        let mut proof = Self {
            verified: event.verified,
            state: event.state.clone(),
            ..Default::default()
        };
        let Some(presentation) = &event.presentation else {
            return proof;
        };
        let requested = &presentation.requested_proof;

        for group in requested.revealed_attr_groups.values() {
            for (name, attr) in &group.values {
                proof.revealed.insert(name.clone(), attr.raw.clone());
            }
        }
        for (name, attr) in &requested.revealed_attrs {
            proof.revealed.insert(name.clone(), attr.raw.clone());
        }
        proof.predicates = requested.predicates.keys().cloned().collect();
        proof.self_attested = requested.self_attested_attrs.clone();
        proof
    }

    pub fn with_revealed(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.revealed.insert(name.into(), raw.into());
        self
    }

    pub fn with_predicate(mut self, name: impl Into<String>) -> Self {
        self.predicates.insert(name.into());
        self
    }

    /// Every attribute name the holder returned, revealed or predicate.
    pub fn returned_names(&self) -> BTreeSet<&str> {
        self.revealed
            .keys()
            .chain(self.predicates.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.revealed.is_empty() && self.predicates.is_empty()
    }
}
