use std::fmt;
use std::time::Duration;

use crate::schema::OperationName;

/// A single field-level schema violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' must be of kind {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("field '{field}' value {value} is outside [{}, {}]", bound(.min), bound(.max))]
    RangeViolation {
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("field '{field}' value '{value}' is not one of {allowed:?}")]
    InvalidEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

fn bound(limit: &Option<f64>) -> String {
    limit.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl ValidationError {
    /// Name of the offending field (`suggestions[2]` for array elements).
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::RangeViolation { field, .. }
            | ValidationError::InvalidEnum { field, .. } => field,
        }
    }
}

/// Every violation found in one validation pass, in field declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Offending field names, deduplicated, in report order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for err in &self.0 {
            if !out.contains(&err.field()) {
                out.push(err.field());
            }
        }
        out
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Failures of the generative-model round trip.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvocationError {
    #[error("model did not answer within {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("model service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("model returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// The error surface of an operation, as seen by callers.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("{operation}: invalid input: {details}")]
    InvalidInput {
        operation: OperationName,
        details: ValidationErrors,
    },

    #[error("{operation}: model invocation failed: {cause}")]
    InvocationFailed {
        operation: OperationName,
        #[source]
        cause: InvocationError,
    },

    #[error("{operation}: model output did not conform: {details}")]
    InvalidModelOutput {
        operation: OperationName,
        details: ValidationErrors,
    },
}

impl OperationError {
    pub fn operation(&self) -> OperationName {
        match self {
            OperationError::InvalidInput { operation, .. }
            | OperationError::InvocationFailed { operation, .. }
            | OperationError::InvalidModelOutput { operation, .. } => *operation,
        }
    }

    /// Whether issuing a fresh `execute` with the same input may succeed.
    /// Bad input has to be edited first.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OperationError::InvalidInput { .. })
    }
}
