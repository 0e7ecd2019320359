//! Request compilation: resolved descriptors into proof-request specs.

use vouch_core::{AttributeSpec, ConnectionId, PresentationDefinition, ProofRequestSpec, Restriction};

use crate::error::EngineError;
use crate::expand::{expand, ResolvedDescriptor};
use crate::filter::{compile_field, CompiledField};
use crate::select::eligible;

/// Attributes of the self-attested identity request.
pub const IDENTITY_ATTRIBUTES: &[&str] = &[
    "email",
    "phone",
    "street_address",
    "city",
    "state_province_region",
    "postalcode",
    "country",
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
];

/// Compile one resolved descriptor at `now` (epoch seconds).
pub fn compile(
    resolved: &ResolvedDescriptor<'_>,
    connection_id: &ConnectionId,
    now: i64,
) -> Result<ProofRequestSpec, EngineError> {
    let restrictions: Vec<Restriction> = resolved
        .descriptor
        .schema_refs
        .iter()
        .map(|schema_id| Restriction {
            schema_id: schema_id.clone(),
        })
        .collect();

    let mut spec = ProofRequestSpec::new(resolved.name(), connection_id.clone());
    for field in &resolved.fields {
        match compile_field(resolved.name(), field, &restrictions, now)? {
            CompiledField::Predicate(p) => {
                spec.predicates.insert(field.path.clone(), p);
            }
            CompiledField::Attribute(a) => {
                spec.attributes.insert(field.path.clone(), a);
            }
        }
    }

    tracing::debug!(
        descriptor = %spec.descriptor_name,
        connection = %connection_id,
        predicates = spec.predicates.len(),
        attributes = spec.attributes.len(),
        "compiled proof request"
    );
    Ok(spec)
}

/// Select, expand and compile every eligible descriptor of a definition.
///
/// A descriptor carrying an unsupported filter is skipped with a warning;
/// the remaining descriptors are still compiled.
pub fn compile_definition(
    definition: &PresentationDefinition,
    connection_id: &ConnectionId,
    now: i64,
) -> Vec<ProofRequestSpec> {
    let mut specs = Vec::new();
    for descriptor in eligible(definition) {
        let compiled: Result<Vec<_>, _> = expand(descriptor)
            .iter()
            .map(|resolved| compile(resolved, connection_id, now))
            .collect();
        match compiled {
            Ok(mut s) => specs.append(&mut s),
            Err(e) => {
                tracing::warn!(descriptor = %descriptor.name, error = %e, "skipping descriptor");
            }
        }
    }
    specs
}

/// Compile the requests of one named descriptor.
pub fn compile_descriptor(
    definition: &PresentationDefinition,
    name: &str,
    connection_id: &ConnectionId,
    now: i64,
) -> Result<Vec<ProofRequestSpec>, EngineError> {
    let descriptor = definition
        .descriptor(name)
        .ok_or_else(|| EngineError::UnknownDescriptor(name.to_string()))?;
    expand(descriptor)
        .iter()
        .map(|resolved| compile(resolved, connection_id, now))
        .collect()
}

/// Request for the self-attested demographics and passport fields, without
/// credential restrictions.
pub fn identity_request(connection_id: &ConnectionId) -> ProofRequestSpec {
    let mut spec = ProofRequestSpec::new("Proof request", connection_id.clone());
    for name in IDENTITY_ATTRIBUTES {
        spec.attributes.insert(
            name.to_string(),
            AttributeSpec {
                name: name.to_string(),
                restrictions: Vec::new(),
            },
        );
    }
    spec
}
