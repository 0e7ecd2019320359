use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent-side connection identifier of a holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a contact whose result records are kept by the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a credential schema.
/// Ledger format: `<issuer_did>:2:<name>:<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub String);

/// Components of a ledger schema identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaParts {
    pub issuer_did: String,
    pub name: String,
    pub version: String,
}

impl SchemaId {
    /// Create a new schema identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the schema ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a ledger schema id into issuer DID, name and version.
    pub fn parts(&self) -> Option<SchemaParts> {
        let parts: Vec<&str> = self.0.split(':').collect();
        if parts.len() < 4 {
            return None;
        }
        Some(SchemaParts {
            issuer_did: parts[0].to_string(),
            name: parts[2].to_string(),
            version: parts[3].to_string(),
        })
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Machine-readable notice sent to a holder. These are the only failure
/// texts that ever leave the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeCode {
    /// The proof was checked and did not satisfy the requirements.
    InvalidProof,
    /// The proof was fine but the issuer may not perform the action.
    InvalidPrivileges,
    /// The exchange failed for technical reasons.
    Unverified,
}

impl NoticeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidProof => "INVALID_PROOF",
            Self::InvalidPrivileges => "INVALID_PRIVILEGES",
            Self::Unverified => "UNVERIFIED",
        }
    }
}

impl fmt::Display for NoticeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
