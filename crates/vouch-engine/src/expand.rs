//! Conditional expansion of `oneOf` fields into concrete descriptors.

use vouch_core::{FieldConstraint, Filter, InputDescriptor};

/// One concrete combination of a descriptor's `oneOf` alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDescriptor<'a> {
    pub descriptor: &'a InputDescriptor,
    /// Chosen alternative index per `oneOf` axis, in declaration order.
    pub choice: Vec<usize>,
    /// Fields to request, `oneOf` fields replaced by their own path plus
    /// the chosen alternative's dependent fields.
    pub fields: Vec<FieldConstraint>,
}

impl<'a> ResolvedDescriptor<'a> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Expand a descriptor into the cartesian product of its `oneOf` axes.
///
/// Combinations come out in lexicographic order with the last axis varying
/// fastest. A descriptor without `oneOf` fields resolves to itself; an axis
/// with no alternatives, or more combinations than fit in `usize`, yields
/// no combinations.
pub fn expand(descriptor: &InputDescriptor) -> Vec<ResolvedDescriptor<'_>> {
    let axes: Vec<usize> = descriptor
        .fields
        .iter()
        .filter_map(|f| match &f.filter {
            Filter::OneOf(alternatives) => Some(alternatives.len()),
            _ => None,
        })
        .collect();

    if axes.is_empty() {
        return vec![ResolvedDescriptor {
            descriptor,
            choice: Vec::new(),
            fields: descriptor.fields.clone(),
        }];
    }
    if axes.contains(&0) {
        tracing::warn!(descriptor = %descriptor.name, "oneOf without alternatives, nothing to request");
        return Vec::new();
    }

    let Some(total) = axes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n)) else {
        tracing::warn!(descriptor = %descriptor.name, axes = ?axes, "oneOf combinations overflow, nothing to request");
        return Vec::new();
    };
    let mut resolved = Vec::with_capacity(total);
    let mut choice = vec![0usize; axes.len()];

    loop {
        resolved.push(ResolvedDescriptor {
            descriptor,
            choice: choice.clone(),
            fields: resolve_fields(descriptor, &choice),
        });

        // Odometer step; done once every axis has wrapped.
        let mut axis = axes.len();
        loop {
            if axis == 0 {
                tracing::debug!(descriptor = %descriptor.name, combinations = resolved.len(), "expanded oneOf axes");
                return resolved;
            }
            axis -= 1;
            choice[axis] += 1;
            if choice[axis] < axes[axis] {
                break;
            }
            choice[axis] = 0;
        }
    }
}

fn resolve_fields(descriptor: &InputDescriptor, choice: &[usize]) -> Vec<FieldConstraint> {
    let mut fields = Vec::new();
    let mut axis = 0;
    for field in &descriptor.fields {
        match &field.filter {
            Filter::OneOf(alternatives) => {
                fields.push(FieldConstraint {
                    path: field.path.clone(),
                    filter: Filter::Presence,
                    value_type: field.value_type,
                    format: field.format.clone(),
                });
                fields.extend(alternatives[choice[axis]].dependent_fields.iter().cloned());
                axis += 1;
            }
            _ => fields.push(field.clone()),
        }
    }
    fields
}
