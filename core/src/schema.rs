use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{ValidationError, ValidationErrors};

/// The named operations this crate knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationName {
    Analyze,
    Humanize,
}

impl OperationName {
    pub const ALL: [OperationName; 2] = [OperationName::Analyze, OperationName::Humanize];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationName::Analyze => "analyze",
            OperationName::Humanize => "humanize",
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Enum,
    Array(&'static FieldKind),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("string"),
            FieldKind::Number => f.write_str("number"),
            FieldKind::Boolean => f.write_str("boolean"),
            FieldKind::Enum => f.write_str("enum"),
            FieldKind::Array(item) => write!(f, "array<{item}>"),
        }
    }
}

/// Value constraints. For strings and arrays `min`/`max` bound the length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed_values: &'static [&'static str],
}

impl Constraints {
    pub const NONE: Constraints = Constraints {
        min: None,
        max: None,
        allowed_values: &[],
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub constraints: Constraints,
    /// Substituted when the value is absent or not an allowed enum value.
    pub fallback: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            constraints: Constraints::NONE,
            fallback: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub const fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.constraints.min = Some(min);
        self.constraints.max = Some(max);
        self
    }

    pub const fn allowed(mut self, values: &'static [&'static str]) -> Self {
        self.constraints.allowed_values = values;
        self
    }

    pub const fn fallback(mut self, value: &'static str) -> Self {
        self.fallback = Some(value);
        self
    }
}

/// An object shape: the ordered set of declared fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl Shape {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// JSON Schema rendition, handed to the model as the output constraint.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in self.fields {
            properties.insert(
                field.name.to_string(),
                kind_schema(field.kind, &field.constraints),
            );
            if field.required {
                required.push(Value::String(field.name.to_string()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn kind_schema(kind: FieldKind, constraints: &Constraints) -> Value {
    let mut schema = match kind {
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Enum => json!({ "type": "string", "enum": constraints.allowed_values }),
        FieldKind::Array(item) => json!({
            "type": "array",
            "items": kind_schema(*item, &Constraints::NONE),
        }),
    };
    let (min_key, max_key, as_length) = match kind {
        FieldKind::String => ("minLength", "maxLength", true),
        FieldKind::Number => ("minimum", "maximum", false),
        FieldKind::Array(_) => ("minItems", "maxItems", true),
        FieldKind::Boolean | FieldKind::Enum => return schema,
    };
    let limit = |v: f64| if as_length { json!(v as u64) } else { json!(v) };
    if let Some(obj) = schema.as_object_mut() {
        if let Some(min) = constraints.min {
            obj.insert(min_key.to_string(), limit(min));
        }
        if let Some(max) = constraints.max {
            obj.insert(max_key.to_string(), limit(max));
        }
    }
    schema
}

/// Input and output shape of one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationSchema {
    pub operation: OperationName,
    pub input: Shape,
    pub output: Shape,
}

pub const LANGUAGE_CODES: &[&str] = &["en", "am"];

const LANGUAGE: FieldDescriptor = FieldDescriptor::optional("language", FieldKind::Enum)
    .allowed(LANGUAGE_CODES)
    .fallback("en");

pub static ANALYZE_SCHEMA: OperationSchema = OperationSchema {
    operation: OperationName::Analyze,
    input: Shape {
        name: "analyze_input",
        fields: &[
            FieldDescriptor::required("message", FieldKind::String).min(1.0),
            LANGUAGE,
        ],
    },
    output: Shape {
        name: "analyze_output",
        fields: &[
            FieldDescriptor::required("tone", FieldKind::String),
            FieldDescriptor::required("clarityScore", FieldKind::Number).range(1.0, 10.0),
            FieldDescriptor::required("suggestions", FieldKind::Array(&FieldKind::String)),
        ],
    },
};

pub static HUMANIZE_SCHEMA: OperationSchema = OperationSchema {
    operation: OperationName::Humanize,
    input: Shape {
        name: "humanize_input",
        fields: &[
            FieldDescriptor::required("senderName", FieldKind::String),
            FieldDescriptor::required("recipient", FieldKind::String),
            FieldDescriptor::required("message", FieldKind::String),
            FieldDescriptor::required("messageContext", FieldKind::String),
            LANGUAGE,
        ],
    },
    output: Shape {
        name: "humanize_output",
        fields: &[FieldDescriptor::required("humanizedMessage", FieldKind::String).min(1.0)],
    },
};

/// Read-only lookup of operation schemas.
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn get(operation: OperationName) -> &'static OperationSchema {
        match operation {
            OperationName::Analyze => &ANALYZE_SCHEMA,
            OperationName::Humanize => &HUMANIZE_SCHEMA,
        }
    }
}

/// Validate `value` against `shape` and deserialize the normalized object into `T`.
///
/// All violations are collected before returning. `null` counts as absent and
/// undeclared fields are dropped.
pub fn validate<T: DeserializeOwned>(value: &Value, shape: &Shape) -> Result<T, ValidationErrors> {
    let normalized = normalize(value, shape)?;
    serde_json::from_value(Value::Object(normalized)).map_err(|err| {
        ValidationErrors(vec![ValidationError::TypeMismatch {
            field: "$".to_string(),
            expected: format!("{} ({err})", shape.name),
        }])
    })
}

/// Field-level checks only; returns the object restricted to declared fields.
pub fn normalize(value: &Value, shape: &Shape) -> Result<Map<String, Value>, ValidationErrors> {
    let Some(object) = value.as_object() else {
        return Err(ValidationErrors(vec![ValidationError::TypeMismatch {
            field: "$".to_string(),
            expected: "object".to_string(),
        }]));
    };

    let mut errors = Vec::new();
    let mut out = Map::new();

    for field in shape.fields {
        let present = object.get(field.name).filter(|v| !v.is_null());
        let Some(raw) = present else {
            if let Some(fallback) = field.fallback {
                out.insert(field.name.to_string(), Value::String(fallback.to_string()));
            } else if field.required {
                errors.push(ValidationError::MissingField {
                    field: field.name.to_string(),
                });
            }
            continue;
        };

        if let (Some(fallback), FieldKind::Enum, Some(s)) = (field.fallback, field.kind, raw.as_str()) {
            if !field.constraints.allowed_values.contains(&s) {
                debug!(field = field.name, value = s, fallback, "unrecognized value, using fallback");
                out.insert(field.name.to_string(), Value::String(fallback.to_string()));
                continue;
            }
        }

        if check_value(field.name, field.kind, &field.constraints, raw, &mut errors) {
            out.insert(field.name.to_string(), raw.clone());
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(ValidationErrors(errors))
    }
}

fn check_value(
    path: &str,
    kind: FieldKind,
    constraints: &Constraints,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> bool {
    let before = errors.len();
    match kind {
        FieldKind::String => match value.as_str() {
            Some(s) => check_range(path, s.chars().count() as f64, constraints, errors),
            None => errors.push(mismatch(path, kind)),
        },
        FieldKind::Number => match value.as_f64() {
            Some(n) => check_range(path, n, constraints, errors),
            None => errors.push(mismatch(path, kind)),
        },
        FieldKind::Boolean => {
            if !value.is_boolean() {
                errors.push(mismatch(path, kind));
            }
        }
        FieldKind::Enum => match value.as_str() {
            Some(s) if constraints.allowed_values.contains(&s) => {}
            Some(s) => errors.push(ValidationError::InvalidEnum {
                field: path.to_string(),
                value: s.to_string(),
                allowed: constraints.allowed_values.iter().map(|v| v.to_string()).collect(),
            }),
            None => errors.push(mismatch(path, kind)),
        },
        FieldKind::Array(item) => match value.as_array() {
            Some(items) => {
                check_range(path, items.len() as f64, constraints, errors);
                for (idx, element) in items.iter().enumerate() {
                    let element_path = format!("{path}[{idx}]");
                    check_value(&element_path, *item, &Constraints::NONE, element, errors);
                }
            }
            None => errors.push(mismatch(path, kind)),
        },
    }
    errors.len() == before
}

fn check_range(path: &str, value: f64, constraints: &Constraints, errors: &mut Vec<ValidationError>) {
    let below = constraints.min.is_some_and(|min| value < min);
    let above = constraints.max.is_some_and(|max| value > max);
    if below || above {
        errors.push(ValidationError::RangeViolation {
            field: path.to_string(),
            value,
            min: constraints.min,
            max: constraints.max,
        });
    }
}

fn mismatch(path: &str, kind: FieldKind) -> ValidationError {
    ValidationError::TypeMismatch {
        field: path.to_string(),
        expected: kind.to_string(),
    }
}
