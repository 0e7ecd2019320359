//! Filter evaluation: compiling a field into a request entry, and checking a
//! returned raw value against its constraint.

use chrono::DateTime;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use vouch_core::{
    AttributeSpec, ConstValue, FieldConstraint, Filter, PatternFilter, PredicateSpec, RangeBound,
    RangeFilter, Restriction, ValueType,
};

use crate::error::EngineError;

/// A field compiled for an outbound proof request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledField {
    Predicate(PredicateSpec),
    Attribute(AttributeSpec),
}

/// Validation check kinds, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Type,
    Format,
    Const,
    Pattern,
    /// No `oneOf` alternative was satisfied.
    Alternatives,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(f, "type"),
            Self::Format => write!(f, "format"),
            Self::Const => write!(f, "const"),
            Self::Pattern => write!(f, "pattern"),
            Self::Alternatives => write!(f, "alternatives"),
        }
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FieldOutcome {
    Passed,
    Failed { check: CheckKind, detail: String },
    /// The proof carries no value for the field.
    Missing,
    /// The field's filter is not understood. Never passes.
    Unsupported { reason: String },
}

impl FieldOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    fn failed(check: CheckKind, detail: impl Into<String>) -> Self {
        Self::Failed {
            check,
            detail: detail.into(),
        }
    }
}

/// Resolve a range filter's predicate value at `now` (epoch seconds).
pub fn predicate_value(range: &RangeFilter, now: i64) -> i64 {
    match range.bound {
        RangeBound::Literal(v) => v,
        RangeBound::RelativeToToday { offset_seconds } => now - offset_seconds,
    }
}

/// Compile one field. Range filters become predicates, everything else a
/// plain attribute request.
pub fn compile_field(
    descriptor: &str,
    field: &FieldConstraint,
    restrictions: &[Restriction],
    now: i64,
) -> Result<CompiledField, EngineError> {
    match &field.filter {
        Filter::Range(range) => Ok(CompiledField::Predicate(PredicateSpec {
            name: field.path.clone(),
            p_type: range.op,
            p_value: predicate_value(range, now),
            restrictions: restrictions.to_vec(),
        })),
        Filter::Unsupported(reason) => Err(EngineError::UnsupportedFilterKind {
            descriptor: descriptor.to_string(),
            path: field.path.clone(),
            reason: reason.clone(),
        }),
        _ => Ok(CompiledField::Attribute(AttributeSpec {
            name: field.path.clone(),
            restrictions: restrictions.to_vec(),
        })),
    }
}

/// Check a returned raw value: type, format, const, pattern, failing fast.
///
/// Range filters are satisfied by the agent-verified predicate and are not
/// re-checked here. `oneOf` alternatives are checked by the validator; only
/// the field's own declared type and format are checked.
pub fn evaluate(field: &FieldConstraint, raw: &str) -> FieldOutcome {
    if let Filter::Unsupported(reason) = &field.filter {
        return FieldOutcome::Unsupported {
            reason: reason.clone(),
        };
    }

    if let Some(value_type) = field.declared_type() {
        if !matches_type(value_type, raw) {
            return FieldOutcome::failed(
                CheckKind::Type,
                format!("expected {}, got {:?}", value_type, raw),
            );
        }
    }

    if field.format.is_some() && !raw.is_empty() && !is_epoch_date(raw) {
        return FieldOutcome::failed(CheckKind::Format, format!("{:?} is not an epoch date", raw));
    }

    match &field.filter {
        Filter::Const(expected) if !matches_const(expected, raw) => FieldOutcome::failed(
            CheckKind::Const,
            format!("expected {:?}, got {:?}", expected.expected_raw(), raw),
        ),
        Filter::Pattern(pattern) if !raw.is_empty() => match_pattern(pattern, raw),
        _ => FieldOutcome::Passed,
    }
}

fn matches_type(value_type: ValueType, raw: &str) -> bool {
    match value_type {
        ValueType::String => true,
        ValueType::Number => raw.trim().parse::<f64>().map_or(false, f64::is_finite),
        ValueType::Boolean => raw == "true" || raw == "false",
    }
}

fn is_epoch_date(raw: &str) -> bool {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .is_some()
}

fn matches_const(expected: &ConstValue, raw: &str) -> bool {
    match expected {
        ConstValue::Number(n) => {
            raw == expected.expected_raw()
                || matches!((raw.trim().parse::<f64>(), n.as_f64()), (Ok(a), Some(b)) if a == b)
        }
        _ => raw == expected.expected_raw(),
    }
}

fn match_pattern(pattern: &PatternFilter, raw: &str) -> FieldOutcome {
    let source = match pattern.source() {
        Ok(s) => s,
        Err(e) => return FieldOutcome::failed(CheckKind::Pattern, e.to_string()),
    };
    match Regex::new(&source) {
        Ok(re) if re.is_match(raw) => FieldOutcome::Passed,
        Ok(_) => FieldOutcome::failed(
            CheckKind::Pattern,
            format!("{:?} does not match /{}/", raw, source),
        ),
        Err(e) => FieldOutcome::failed(CheckKind::Pattern, format!("invalid pattern: {}", e)),
    }
}
