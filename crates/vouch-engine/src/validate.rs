//! Proof validation: field-set reconciliation, then field-by-field checks.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use vouch_core::{FieldConstraint, Filter, InputDescriptor, ReturnedProof};

use crate::filter::{evaluate, CheckKind, FieldOutcome};

/// Why a proof did not validate as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum ValidationFailure {
    /// The returned field names do not match the descriptor's fields.
    FieldSetMismatch {
        unexpected: Vec<String>,
        missing: Vec<String>,
    },
    /// Field sets match but some fields failed their checks.
    FieldsFailed { fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub failure: Option<ValidationFailure>,
    pub per_field: BTreeMap<String, FieldOutcome>,
    /// Revealed name → raw value, as accepted from the proof.
    pub snapshot: BTreeMap<String, String>,
}

impl ValidationOutcome {
    /// Whether the proof was meant for this descriptor at all.
    pub fn is_mismatch(&self) -> bool {
        matches!(self.failure, Some(ValidationFailure::FieldSetMismatch { .. }))
    }
}

/// Validate a returned proof against the descriptor it answers.
pub fn validate(proof: &ReturnedProof, descriptor: &InputDescriptor) -> ValidationOutcome {
    let snapshot = proof.revealed.clone();

    if let Some(failure) = reconcile(proof, descriptor) {
        tracing::debug!(descriptor = %descriptor.name, failure = ?failure, "field set mismatch");
        return ValidationOutcome {
            passed: false,
            failure: Some(failure),
            per_field: BTreeMap::new(),
            snapshot,
        };
    }

    let mut per_field = BTreeMap::new();
    for field in &descriptor.fields {
        let outcome = match &field.filter {
            Filter::OneOf(alternatives) => {
                let own = check_field(proof, field);
                if !own.is_pass() {
                    own
                } else {
                    let satisfied = alternatives.iter().find_map(|alt| {
                        let outcomes: Vec<(String, FieldOutcome)> = alt
                            .dependent_fields
                            .iter()
                            .map(|d| (d.path.clone(), check_field(proof, d)))
                            .collect();
                        outcomes
                            .iter()
                            .all(|(_, o)| o.is_pass())
                            .then_some(outcomes)
                    });
                    match satisfied {
                        Some(outcomes) => {
                            per_field.extend(outcomes);
                            FieldOutcome::Passed
                        }
                        None => FieldOutcome::Failed {
                            check: CheckKind::Alternatives,
                            detail: "no alternative fully satisfied".into(),
                        },
                    }
                }
            }
            _ => check_field(proof, field),
        };
        tracing::debug!(descriptor = %descriptor.name, field = %field.path, outcome = ?outcome, "field checked");
        per_field.insert(field.path.clone(), outcome);
    }

    let failed: Vec<String> = per_field
        .iter()
        .filter(|(_, o)| !o.is_pass())
        .map(|(path, _)| path.clone())
        .collect();
    let passed = failed.is_empty();

    ValidationOutcome {
        passed,
        failure: (!passed).then_some(ValidationFailure::FieldsFailed { fields: failed }),
        per_field,
        snapshot,
    }
}

/// Compare returned names with descriptor paths, letting names that are
/// `oneOf` dependent fields through.
fn reconcile(proof: &ReturnedProof, descriptor: &InputDescriptor) -> Option<ValidationFailure> {
    let returned = proof.returned_names();
    let expected: BTreeSet<&str> = descriptor.fields.iter().map(|f| f.path.as_str()).collect();

    if returned.is_empty() || expected.is_empty() || returned == expected {
        return mismatch_if(returned.is_empty() || expected.is_empty(), &returned, &expected);
    }

    let leftover: BTreeSet<&str> = returned.difference(&expected).copied().collect();
    if !leftover.iter().all(|name| descriptor.is_dependent_path(name)) {
        return mismatch_if(true, &returned, &expected);
    }
    let reduced: BTreeSet<&str> = returned.difference(&leftover).copied().collect();
    mismatch_if(reduced != expected, &returned, &expected)
}

fn mismatch_if(
    mismatch: bool,
    returned: &BTreeSet<&str>,
    expected: &BTreeSet<&str>,
) -> Option<ValidationFailure> {
    mismatch.then(|| ValidationFailure::FieldSetMismatch {
        unexpected: returned.difference(expected).map(|s| s.to_string()).collect(),
        missing: expected.difference(returned).map(|s| s.to_string()).collect(),
    })
}

/// One field against the proof. A revealed value always goes through its
/// type and format checks; a range field may instead be proven by predicate.
fn check_field(proof: &ReturnedProof, field: &FieldConstraint) -> FieldOutcome {
    match (&field.filter, proof.revealed.get(&field.path)) {
        (Filter::Unsupported(reason), _) => FieldOutcome::Unsupported {
            reason: reason.clone(),
        },
        (_, Some(raw)) => evaluate(field, raw),
        (Filter::Range(_), None) if proof.predicates.contains(&field.path) => FieldOutcome::Passed,
        (_, None) => FieldOutcome::Missing,
    }
}
