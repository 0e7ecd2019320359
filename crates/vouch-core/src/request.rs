//! Outbound proof requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::definition::RangeOp;
use crate::types::{ConnectionId, SchemaId};

/// Credential restriction attached to every requested attribute and predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub schema_id: SchemaId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateSpec {
    pub name: String,
    pub p_type: RangeOp,
    pub p_value: i64,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

/// A compiled proof request for one resolved descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequestSpec {
    #[serde(rename = "name")]
    pub descriptor_name: String,
    pub comment: String,
    pub connection_id: ConnectionId,
    #[serde(default)]
    pub predicates: BTreeMap<String, PredicateSpec>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
}

impl ProofRequestSpec {
    pub fn new(descriptor_name: impl Into<String>, connection_id: ConnectionId) -> Self {
        let descriptor_name = descriptor_name.into();
        Self {
            comment: format!("Requesting Presentation for {}", descriptor_name),
            descriptor_name,
            connection_id,
            predicates: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Every requested name, predicate or attribute, sorted.
    pub fn requested_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .predicates
            .keys()
            .chain(self.attributes.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Render the agent's send-request body.
    pub fn to_send_request(&self, nonce: u64) -> SendPresentationRequest {
        SendPresentationRequest {
            trace: false,
            comment: self.comment.clone(),
            connection_id: self.connection_id.clone(),
            proof_request: ProofRequestBody {
                name: self.descriptor_name.clone(),
                version: "1.0".to_string(),
                nonce: nonce.to_string(),
                requested_attributes: self.attributes.clone(),
                requested_predicates: self.predicates.clone(),
            },
        }
    }
}

/// `POST /present-proof/send-request` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPresentationRequest {
    pub trace: bool,
    pub comment: String,
    pub connection_id: ConnectionId,
    pub proof_request: ProofRequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequestBody {
    pub name: String,
    pub version: String,
    pub nonce: String,
    pub requested_attributes: BTreeMap<String, AttributeSpec>,
    pub requested_predicates: BTreeMap<String, PredicateSpec>,
}
