//! Engine configuration: issuance, governance, and business rules.

use serde::{Deserialize, Serialize};

/// Everything the decision engine needs besides the definition itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub issuance: IssuanceConfig,

    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Business rules keyed by descriptor name.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuanceConfig {
    /// Schema of the issued credential: `<issuer_did>:2:<name>:<version>`.
    #[serde(default = "default_schema_id")]
    pub schema_id: String,
    /// Credential lifetime in days.
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
    /// Issuer organisation name written into the credential.
    #[serde(default = "default_organization_name")]
    pub organization_name: String,
    /// Flat attribute list of the issued credential.
    #[serde(default = "default_issued_attributes")]
    pub attributes: Vec<IssuedAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAttribute {
    pub name: String,
    pub source: AttributeSource,
}

/// Where an issued attribute's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeSource {
    /// A revealed attribute of the accepted proofs. Missing values issue as `""`.
    Revealed { attribute: String },
    /// A fresh random UUID.
    Uuid,
    /// Issue time, epoch seconds.
    IssueTime,
    /// Issue time plus the validity period, epoch seconds.
    ExpirationTime,
    /// `<governance name> v<governance version>`.
    GovernanceApplied,
    /// The issuer organisation name.
    IssuerName,
    Literal { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default = "default_governance_name")]
    pub name: String,
    #[serde(default = "default_governance_version")]
    pub version: String,
    /// Issuer DIDs whose credentials are accepted. Empty accepts none.
    #[serde(default)]
    pub trusted_issuers: Vec<String>,
    /// Accepted schema ids. Empty accepts any schema from a trusted issuer.
    #[serde(default)]
    pub trusted_schemas: Vec<String>,
    /// Privileges this issuer holds under the governance framework.
    #[serde(default = "default_privileges")]
    pub privileges: Vec<String>,
    /// Privilege required to issue.
    #[serde(default = "default_required_privilege")]
    pub required_privilege: String,
}

/// A business rule bound to one descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Result value in an accepted set and sample collected within a window.
    LabResult {
        descriptor: String,
        result_attribute: String,
        accepted_values: Vec<String>,
        date_attribute: String,
        window_hours: i64,
    },
    /// Series complete and last dose older than the maturation period.
    Vaccination {
        descriptor: String,
        completion_attribute: String,
        date_attribute: String,
        maturation_days: i64,
    },
    /// One attribute must carry one of the accepted values.
    AcceptedValues {
        descriptor: String,
        attribute: String,
        accepted_values: Vec<String>,
    },
}

impl RuleConfig {
    pub fn descriptor(&self) -> &str {
        match self {
            Self::LabResult { descriptor, .. }
            | Self::Vaccination { descriptor, .. }
            | Self::AcceptedValues { descriptor, .. } => descriptor,
        }
    }
}

// Default value functions
fn default_schema_id() -> String {
    "RuUsx2fzGbPBbdV1V8WVuA:2:Trusted_Traveler:1.4".into()
}
fn default_validity_days() -> i64 {
    30
}
fn default_organization_name() -> String {
    "Vouch Issuer".into()
}
fn default_governance_name() -> String {
    "Trusted Traveler Governance".into()
}
fn default_governance_version() -> String {
    "1.0".into()
}
fn default_privileges() -> Vec<String> {
    vec![default_required_privilege()]
}
fn default_required_privilege() -> String {
    "issue_trusted_traveler".into()
}

fn revealed(name: &str, attribute: &str) -> IssuedAttribute {
    IssuedAttribute {
        name: name.into(),
        source: AttributeSource::Revealed {
            attribute: attribute.into(),
        },
    }
}

fn computed(name: &str, source: AttributeSource) -> IssuedAttribute {
    IssuedAttribute {
        name: name.into(),
        source,
    }
}

fn default_issued_attributes() -> Vec<IssuedAttribute> {
    vec![
        revealed("traveler_surnames", "patient_surnames"),
        revealed("traveler_given_names", "patient_given_names"),
        revealed("traveler_date_of_birth", "patient_date_of_birth"),
        revealed("traveler_gender_legal", "patient_gender_legal"),
        revealed("traveler_country", "patient_country"),
        computed(
            "traveler_origin_country",
            AttributeSource::Literal {
                value: String::new(),
            },
        ),
        revealed("traveler_email", "patient_email"),
        computed("trusted_traveler_id", AttributeSource::Uuid),
        computed("trusted_traveler_issue_date_time", AttributeSource::IssueTime),
        computed(
            "trusted_traveler_expiration_date_time",
            AttributeSource::ExpirationTime,
        ),
        computed("governance_applied", AttributeSource::GovernanceApplied),
        computed("credential_issuer_name", AttributeSource::IssuerName),
        computed("credential_issue_date", AttributeSource::IssueTime),
    ]
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::LabResult {
            descriptor: "Lab_Result".into(),
            result_attribute: "lab_result".into(),
            accepted_values: vec!["Negative".into()],
            date_attribute: "lab_specimen_collected_date".into(),
            window_hours: 72,
        },
        RuleConfig::Vaccination {
            descriptor: "Vaccination".into(),
            completion_attribute: "vaccine_series_complete".into(),
            date_attribute: "vaccine_administration_date".into(),
            maturation_days: 14,
        },
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            issuance: IssuanceConfig::default(),
            governance: GovernanceConfig::default(),
            rules: default_rules(),
        }
    }
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            schema_id: default_schema_id(),
            validity_days: default_validity_days(),
            organization_name: default_organization_name(),
            attributes: default_issued_attributes(),
        }
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            name: default_governance_name(),
            version: default_governance_version(),
            trusted_issuers: Vec::new(),
            trusted_schemas: Vec::new(),
            privileges: default_privileges(),
            required_privilege: default_required_privilege(),
        }
    }
}

impl GovernanceConfig {
    /// `<name> v<version>`, as stamped into issued credentials.
    pub fn applied_label(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }
}
