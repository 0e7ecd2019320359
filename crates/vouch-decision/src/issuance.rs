//! Issued credential contents and self-attested identity records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vouch_core::{AttributeSource, ConnectionId, IssuanceConfig, SchemaId, SchemaParts};

use crate::error::DecisionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
}

/// An issue-credential call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOffer {
    pub connection_id: ConnectionId,
    pub schema_id: SchemaId,
    pub schema_issuer_did: String,
    pub schema_name: String,
    pub schema_version: String,
    pub attributes: Vec<CredentialAttribute>,
}

/// Validated issuance settings.
#[derive(Debug, Clone)]
pub struct Issuance {
    config: IssuanceConfig,
    schema: SchemaParts,
    governance_label: String,
}

impl Issuance {
    pub fn new(config: IssuanceConfig, governance_label: String) -> Result<Self, DecisionError> {
        let schema = SchemaId::new(config.schema_id.clone())
            .parts()
            .ok_or_else(|| DecisionError::InvalidIssuanceSchema(config.schema_id.clone()))?;
        Ok(Self {
            config,
            schema,
            governance_label,
        })
    }

    /// Build the flat attribute list from accepted proof values.
    pub fn attributes(
        &self,
        accepted: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Vec<CredentialAttribute> {
        let issued = now.timestamp();
        let expires = (now + Duration::days(self.config.validity_days)).timestamp();

        self.config
            .attributes
            .iter()
            .map(|attr| {
                let value = match &attr.source {
                    AttributeSource::Revealed { attribute } => {
                        accepted.get(attribute).cloned().unwrap_or_default()
                    }
                    AttributeSource::Uuid => uuid::Uuid::new_v4().to_string(),
                    AttributeSource::IssueTime => issued.to_string(),
                    AttributeSource::ExpirationTime => expires.to_string(),
                    AttributeSource::GovernanceApplied => self.governance_label.clone(),
                    AttributeSource::IssuerName => self.config.organization_name.clone(),
                    AttributeSource::Literal { value } => value.clone(),
                };
                CredentialAttribute {
                    name: attr.name.clone(),
                    value,
                }
            })
            .collect()
    }

    pub fn offer(
        &self,
        connection_id: ConnectionId,
        attributes: Vec<CredentialAttribute>,
    ) -> CredentialOffer {
        CredentialOffer {
            connection_id,
            schema_id: SchemaId::new(self.config.schema_id.clone()),
            schema_issuer_did: self.schema.issuer_did.clone(),
            schema_name: self.schema.name.clone(),
            schema_version: self.schema.version.clone(),
            attributes,
        }
    }
}

const DEMOGRAPHIC_FIELDS: &[&str] = &[
    "email",
    "phone",
    "street_address",
    "city",
    "state_province_region",
    "postalcode",
    "country",
];

const PASSPORT_FIELDS: &[&str] = &[
    "passport_number",
    "surname",
    "given_names",
    "sex",
    "date_of_birth",
    "place_of_birth",
    "nationality",
    "date_of_issue",
    "date_of_expiration",
    "type",
    "issuing_country",
    "authority",
    "photo",
];

/// Identity data a holder attested to without a backing credential.
/// Never treated as verified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelfAttestedIdentity {
    pub demographics: BTreeMap<String, String>,
    pub passport: BTreeMap<String, String>,
}

impl SelfAttestedIdentity {
    /// Split self-attested attributes into demographic and passport records.
    /// Attributes belonging to neither are dropped.
    pub fn from_attributes(attrs: &BTreeMap<String, String>) -> Self {
        let pick = |fields: &[&str]| -> BTreeMap<String, String> {
            attrs
                .iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        Self {
            demographics: pick(DEMOGRAPHIC_FIELDS),
            passport: pick(PASSPORT_FIELDS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.demographics.is_empty() && self.passport.is_empty()
    }
}
