//! Per-contact proof result records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall verification status of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Verified => write!(f, "verified"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Outcome of one descriptor for one contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DescriptorResult {
    /// `None` while the proof is outstanding.
    pub result: Option<bool>,
    /// Accepted attribute snapshot: revealed name → raw value.
    #[serde(default)]
    pub presentation: BTreeMap<String, String>,
}

/// Result records of one contact, keyed by descriptor name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProofResultRecord {
    /// Id of the definition the entries were produced under.
    #[serde(default)]
    pub definition_id: Option<String>,
    #[serde(default)]
    pub status: VerificationStatus,
    #[serde(default)]
    pub presentations: BTreeMap<String, DescriptorResult>,
}

impl ProofResultRecord {
    pub fn new(definition_id: Option<String>) -> Self {
        Self {
            definition_id,
            ..Default::default()
        }
    }

    /// Drop all entries when they were produced under another definition.
    /// Returns whether a reset happened.
    pub fn align_definition(&mut self, definition_id: Option<&str>) -> bool {
        if self.definition_id.as_deref() == definition_id {
            return false;
        }
        tracing::debug!(
            from = ?self.definition_id,
            to = ?definition_id,
            "resetting result records for new definition"
        );
        *self = Self::new(definition_id.map(str::to_string));
        true
    }

    /// Write or replace the entry for `descriptor`.
    pub fn upsert(
        &mut self,
        descriptor: &str,
        result: Option<bool>,
        presentation: BTreeMap<String, String>,
    ) {
        self.presentations.insert(
            descriptor.to_string(),
            DescriptorResult {
                result,
                presentation,
            },
        );
    }

    /// Reset `descriptor` to outstanding, keeping no snapshot.
    pub fn mark_requested(&mut self, descriptor: &str) {
        self.upsert(descriptor, None, BTreeMap::new());
    }

    pub fn result(&self, descriptor: &str) -> Option<bool> {
        self.presentations.get(descriptor).and_then(|r| r.result)
    }

    pub fn entry(&self, descriptor: &str) -> Option<&DescriptorResult> {
        self.presentations.get(descriptor)
    }

    /// Union of all accepted snapshots; later descriptors win on key collisions.
    pub fn accepted_attributes(&self) -> BTreeMap<String, String> {
        self.presentations
            .values()
            .filter(|r| r.result == Some(true))
            .flat_map(|r| r.presentation.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
