//! Presentation definitions: the requirement document that drives both the
//! outbound proof requests and the validation of returned proofs.
//!
//! The JSON document uses ad hoc filter keywords (`exclusiveMinimum`,
//! `const`, `oneOf`, ...). They are parsed once into the closed [`Filter`]
//! variant so the rest of the engine dispatches on one enum.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::CoreError;
use crate::types::SchemaId;

/// A parsed presentation definition. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationDefinition {
    /// Document id; used to detect when stored results belong to an older definition.
    pub id: Option<String>,
    /// Input descriptors in document order.
    pub input_descriptors: Vec<InputDescriptor>,
    /// Submission requirements, when the document declares any.
    pub submission_requirements: Option<Vec<SubmissionRequirement>>,
}

/// A named requirement block: which credential fields must be revealed and how.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    pub name: String,
    pub group: BTreeSet<String>,
    pub schema_refs: Vec<SchemaId>,
    pub fields: Vec<FieldConstraint>,
}

/// A constraint on one proof attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConstraint {
    /// Attribute key, without the `$.` prefix.
    pub path: String,
    pub filter: Filter,
    /// A `type` declared next to another filter kind.
    pub value_type: Option<ValueType>,
    /// Optional `format` tag (e.g. `date`).
    pub format: Option<String>,
}

/// The filter kinds a field constraint can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// No filter: the attribute only has to be revealed.
    Presence,
    Range(RangeFilter),
    Const(ConstValue),
    Pattern(PatternFilter),
    TypeCheck(ValueType),
    /// Disjunctive alternatives; exactly one has to be satisfied.
    OneOf(Vec<Alternative>),
    /// A filter the engine does not understand. Always fails closed.
    Unsupported(String),
}

/// One acceptable alternative of a `oneOf` filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub dependent_fields: Vec<FieldConstraint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFilter {
    pub op: RangeOp,
    pub bound: RangeBound,
}

/// Comparison operator of a range filter, in predicate wire notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RangeOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl RangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "exclusiveMinimum" => Some(Self::Gt),
            "minimum" => Some(Self::Ge),
            "exclusiveMaximum" => Some(Self::Lt),
            "maximum" => Some(Self::Le),
            _ => None,
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Literal(i64),
    /// `today:<unit>:<seconds>`: the bound is `now - offset_seconds` at compile time.
    RelativeToToday { offset_seconds: i64 },
}

/// Expected value of a `const` filter.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl ConstValue {
    /// The raw string a matching proof attribute must carry.
    ///
    /// Numbers are rendered the way the holder's agent encodes them, so
    /// `5.0` is expected as `"5"`.
    pub fn expected_raw(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.to_string()
                } else if let Some(u) = n.as_u64() {
                    u.to_string()
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        (f as i64).to_string()
                    } else {
                        f.to_string()
                    }
                }
            }
        }
    }
}

/// A regular-expression filter, possibly stored base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFilter {
    pub pattern: String,
    pub base64_encoded: bool,
}

impl PatternFilter {
    /// Wrap a stored pattern, detecting base64 encoding: the pattern is
    /// treated as encoded when decoding then re-encoding reproduces it and
    /// the decoded bytes are text.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let base64_encoded = match BASE64.decode(pattern.as_bytes()) {
            Ok(bytes) => BASE64.encode(&bytes) == pattern && std::str::from_utf8(&bytes).is_ok(),
            Err(_) => false,
        };
        Self {
            pattern,
            base64_encoded,
        }
    }

    /// The regular expression source, decoded when necessary.
    pub fn source(&self) -> Result<String, CoreError> {
        if !self.base64_encoded {
            return Ok(self.pattern.clone());
        }
        let bytes = BASE64
            .decode(self.pattern.as_bytes())
            .map_err(|e| CoreError::InvalidPattern(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CoreError::InvalidPattern(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// Selects which descriptor groups matter for an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionRequirement {
    From {
        name: Option<String>,
        group: String,
    },
    FromNested {
        name: Option<String>,
        requirements: Vec<SubmissionRequirement>,
    },
}

impl SubmissionRequirement {
    pub fn from_group(group: impl Into<String>) -> Self {
        Self::From {
            name: None,
            group: group.into(),
        }
    }

    pub fn nested(requirements: Vec<SubmissionRequirement>) -> Self {
        Self::FromNested {
            name: None,
            requirements,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::From { name, .. } | Self::FromNested { name, .. } => name.as_deref(),
        }
    }
}

impl FieldConstraint {
    pub fn new(path: impl Into<String>, filter: Filter) -> Self {
        Self {
            path: path.into(),
            filter,
            value_type: None,
            format: None,
        }
    }

    /// A field that only has to be revealed.
    pub fn presence(path: impl Into<String>) -> Self {
        Self::new(path, Filter::Presence)
    }

    /// Attach a declared `type` alongside the primary filter.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// The type this field must have, whether declared as the filter itself
    /// or next to another filter kind.
    pub fn declared_type(&self) -> Option<ValueType> {
        match self.filter {
            Filter::TypeCheck(t) => Some(t),
            _ => self.value_type,
        }
    }

    pub fn is_one_of(&self) -> bool {
        matches!(self.filter, Filter::OneOf(_))
    }
}

impl InputDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: BTreeSet::new(),
            schema_refs: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group.insert(group.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_refs.push(SchemaId::new(schema));
        self
    }

    pub fn with_field(mut self, field: FieldConstraint) -> Self {
        self.fields.push(field);
        self
    }

    /// Paths of all fields, in declaration order.
    pub fn field_paths(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.path.as_str()).collect()
    }

    /// Whether `path` is a dependent field of any `oneOf` alternative.
    pub fn is_dependent_path(&self, path: &str) -> bool {
        self.fields.iter().any(|field| match &field.filter {
            Filter::OneOf(alternatives) => alternatives
                .iter()
                .any(|alt| alt.dependent_fields.iter().any(|d| d.path == path)),
            _ => false,
        })
    }
}

impl PresentationDefinition {
    /// Parse a definition document. Accepts either the bare definition or a
    /// wrapper object with a `presentation_definition` key.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, CoreError> {
        if let Some(inner) = value.get_mut("presentation_definition") {
            value = inner.take();
        }
        let raw: RawDefinition = serde_json::from_value(value)?;
        raw.into_definition()
    }

    /// Look up a descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&InputDescriptor> {
        self.input_descriptors.iter().find(|d| d.name == name)
    }
}

// --- Document parsing ---

#[derive(Deserialize)]
struct RawDefinition {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    input_descriptors: Vec<RawDescriptor>,
    #[serde(default)]
    submission_requirements: Option<Vec<RawRequirement>>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    group: Vec<String>,
    #[serde(default)]
    schema: Vec<RawSchema>,
    #[serde(default)]
    constraints: RawConstraints,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSchema {
    Uri { uri: String },
    Plain(String),
}

#[derive(Deserialize, Default)]
struct RawConstraints {
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Deserialize)]
struct RawField {
    path: RawPath,
    #[serde(default)]
    filter: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Single(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawAlternative {
    #[serde(default)]
    dependent_fields: Vec<RawField>,
}

#[derive(Deserialize)]
struct RawRequirement {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    from_nested: Option<Vec<RawRequirement>>,
}

impl RawDefinition {
    fn into_definition(self) -> Result<PresentationDefinition, CoreError> {
        let mut seen = HashSet::new();
        let mut input_descriptors = Vec::with_capacity(self.input_descriptors.len());
        for raw in self.input_descriptors {
            let descriptor = raw.into_descriptor()?;
            if !seen.insert(descriptor.name.clone()) {
                return Err(CoreError::DuplicateDescriptor(descriptor.name));
            }
            input_descriptors.push(descriptor);
        }

        let submission_requirements = self
            .submission_requirements
            .map(|reqs| {
                reqs.into_iter()
                    .map(RawRequirement::into_requirement)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(PresentationDefinition {
            id: self.id,
            input_descriptors,
            submission_requirements,
        })
    }
}

impl RawDescriptor {
    fn into_descriptor(self) -> Result<InputDescriptor, CoreError> {
        let name = self
            .name
            .or(self.id)
            .ok_or_else(|| CoreError::MissingField("input_descriptors[].name".into()))?;

        let schema_refs = self
            .schema
            .into_iter()
            .map(|s| match s {
                RawSchema::Uri { uri } => SchemaId::new(uri),
                RawSchema::Plain(uri) => SchemaId::new(uri),
            })
            .collect();

        let fields = self
            .constraints
            .fields
            .into_iter()
            .map(RawField::into_constraint)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InputDescriptor {
            name,
            group: self.group.into_iter().collect(),
            schema_refs,
            fields,
        })
    }
}

impl RawRequirement {
    fn into_requirement(self) -> Result<SubmissionRequirement, CoreError> {
        match (self.from, self.from_nested) {
            (Some(group), None) => Ok(SubmissionRequirement::From {
                name: self.name,
                group,
            }),
            (None, Some(nested)) => Ok(SubmissionRequirement::FromNested {
                name: self.name,
                requirements: nested
                    .into_iter()
                    .map(RawRequirement::into_requirement)
                    .collect::<Result<Vec<_>, _>>()?,
            }),
            (Some(_), Some(_)) => Err(CoreError::InvalidDefinition(
                "submission requirement has both `from` and `from_nested`".into(),
            )),
            (None, None) => Err(CoreError::InvalidDefinition(
                "submission requirement needs `from` or `from_nested`".into(),
            )),
        }
    }
}

impl RawPath {
    fn attribute_key(self) -> Result<String, CoreError> {
        let first = match self {
            RawPath::Single(p) => Some(p),
            RawPath::Many(paths) => paths.into_iter().find(|p| !p.is_empty()),
        };
        let path = first.ok_or_else(|| CoreError::MissingField("fields[].path".into()))?;
        let key = path.strip_prefix("$.").unwrap_or(&path);
        if key.is_empty() {
            return Err(CoreError::MissingField("fields[].path".into()));
        }
        Ok(key.to_string())
    }
}

impl RawField {
    fn into_constraint(self) -> Result<FieldConstraint, CoreError> {
        let path = self.path.attribute_key()?;
        match self.filter {
            None => Ok(FieldConstraint::presence(path)),
            Some(map) => parse_filter(path, &map),
        }
    }
}

fn parse_filter(path: String, map: &Map<String, Value>) -> Result<FieldConstraint, CoreError> {
    let unsupported = |path: String, reason: String| {
        Ok(FieldConstraint::new(path, Filter::Unsupported(reason)))
    };

    let format = match map.get("format") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => return unsupported(path, format!("non-string format {}", other)),
    };

    let value_type = match map.get("type") {
        None => None,
        Some(Value::String(t)) => match t.as_str() {
            "string" => Some(ValueType::String),
            "number" => Some(ValueType::Number),
            "boolean" => Some(ValueType::Boolean),
            other => return unsupported(path, format!("type `{}`", other)),
        },
        Some(other) => return unsupported(path, format!("non-string type {}", other)),
    };

    let mut primary = Vec::new();
    for (keyword, value) in map {
        let filter = match keyword.as_str() {
            "type" | "format" => continue,
            "const" => match value {
                Value::String(s) => Filter::Const(ConstValue::Text(s.clone())),
                Value::Number(n) => Filter::Const(ConstValue::Number(n.clone())),
                Value::Bool(b) => Filter::Const(ConstValue::Bool(*b)),
                other => Filter::Unsupported(format!("const {}", other)),
            },
            "pattern" => match value {
                Value::String(s) => Filter::Pattern(PatternFilter::new(s.clone())),
                other => Filter::Unsupported(format!("pattern {}", other)),
            },
            "oneOf" => parse_one_of(value)?,
            kw => match RangeOp::from_keyword(kw) {
                Some(op) => match parse_bound(value) {
                    Some(bound) => Filter::Range(RangeFilter { op, bound }),
                    None => Filter::Unsupported(format!("{} bound {}", kw, value)),
                },
                None => Filter::Unsupported(format!("keyword `{}`", kw)),
            },
        };
        primary.push(filter);
    }

    let filter = match primary.len() {
        0 => match value_type {
            Some(t) => {
                return Ok(FieldConstraint {
                    path,
                    filter: Filter::TypeCheck(t),
                    value_type: None,
                    format,
                })
            }
            None => Filter::Presence,
        },
        1 => primary.remove(0),
        n => Filter::Unsupported(format!("{} filter kinds on one field", n)),
    };

    Ok(FieldConstraint {
        path,
        filter,
        value_type,
        format,
    })
}

fn parse_one_of(value: &Value) -> Result<Filter, CoreError> {
    let Value::Array(items) = value else {
        return Ok(Filter::Unsupported(format!("oneOf {}", value)));
    };
    let mut alternatives = Vec::with_capacity(items.len());
    for item in items {
        let raw: RawAlternative = serde_json::from_value(item.clone())?;
        if raw.dependent_fields.is_empty() {
            return Ok(Filter::Unsupported(
                "oneOf alternative without dependent_fields".into(),
            ));
        }
        let dependent_fields = raw
            .dependent_fields
            .into_iter()
            .map(RawField::into_constraint)
            .collect::<Result<Vec<_>, _>>()?;
        alternatives.push(Alternative { dependent_fields });
    }
    Ok(Filter::OneOf(alternatives))
}

fn parse_bound(value: &Value) -> Option<RangeBound> {
    match value {
        Value::Number(n) => n.as_i64().map(RangeBound::Literal),
        Value::String(s) => {
            if let Some(rest) = s.strip_prefix("today:") {
                let offset = rest.split(':').nth(1)?.trim().parse::<i64>().ok()?;
                Some(RangeBound::RelativeToToday {
                    offset_seconds: offset,
                })
            } else {
                s.trim().parse::<i64>().ok().map(RangeBound::Literal)
            }
        }
        _ => None,
    }
}
