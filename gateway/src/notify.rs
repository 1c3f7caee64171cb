use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Serialize;
use slipdesk_core::{InvocationError, OperationError, OperationName};

/// Toast payload the UI shows when an operation fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: &'static str,
    pub retryable: bool,
}

fn feature(operation: OperationName) -> &'static str {
    match operation {
        OperationName::Analyze => "Message analysis",
        OperationName::Humanize => "Message rewrite",
    }
}

impl Notification {
    pub fn from_error(err: &OperationError) -> (StatusCode, Self) {
        let feature = feature(err.operation());
        let (status, title, description) = match err {
            OperationError::InvalidInput { details, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Please check the message slip".to_string(),
                format!(
                    "{feature} needs these fields fixed: {}.",
                    details.fields().join(", ")
                ),
            ),
            OperationError::InvocationFailed {
                cause: InvocationError::Timeout { after },
                ..
            } => (
                StatusCode::GATEWAY_TIMEOUT,
                "The AI assistant is taking too long".to_string(),
                format!(
                    "{feature} got no answer within {} seconds. Please try again.",
                    after.as_secs()
                ),
            ),
            OperationError::InvocationFailed { .. } => (
                StatusCode::BAD_GATEWAY,
                "The AI assistant is unavailable".to_string(),
                format!("{feature} could not reach the AI service. Please try again."),
            ),
            OperationError::InvalidModelOutput { .. } => (
                StatusCode::BAD_GATEWAY,
                "The AI assistant gave an unusable answer".to_string(),
                format!("{feature} returned an incomplete result, so nothing was changed. Please try again."),
            ),
        };

        (
            status,
            Self {
                title,
                description,
                variant: "destructive",
                retryable: err.is_retryable(),
            },
        )
    }

    /// Request body the gateway could not read as JSON. Never retryable.
    pub fn from_rejection(rejection: &JsonRejection) -> (StatusCode, Self) {
        (
            rejection.status(),
            Self {
                title: "We couldn't read that request".to_string(),
                description: rejection.body_text(),
                variant: "destructive",
                retryable: false,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipdesk_core::{ValidationError, ValidationErrors};
    use std::time::Duration;

    #[test]
    fn invalid_input_names_the_fields() {
        let err = OperationError::InvalidInput {
            operation: OperationName::Humanize,
            details: ValidationErrors(vec![
                ValidationError::MissingField { field: "senderName".to_string() },
                ValidationError::MissingField { field: "recipient".to_string() },
            ]),
        };
        let (status, note) = Notification::from_error(&err);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            note.description,
            "Message rewrite needs these fields fixed: senderName, recipient."
        );
        assert!(!note.retryable);
    }

    #[test]
    fn service_failures_offer_retry() {
        let timeout = OperationError::InvocationFailed {
            operation: OperationName::Analyze,
            cause: InvocationError::Timeout { after: Duration::from_secs(30) },
        };
        let (status, note) = Notification::from_error(&timeout);
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(note.retryable);

        let garbled = OperationError::InvalidModelOutput {
            operation: OperationName::Analyze,
            details: ValidationErrors(vec![]),
        };
        let (status, note) = Notification::from_error(&garbled);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(note.variant, "destructive");
        assert!(note.retryable);
    }

    #[tokio::test]
    async fn unreadable_body_is_not_retryable() {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::{header, Request};
        use axum::Json;

        let request = Request::post("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let rejection = Json::<serde_json::Value>::from_request(request, &())
            .await
            .err()
            .unwrap();
        let (status, note) = Notification::from_rejection(&rejection);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(note.variant, "destructive");
        assert!(!note.retryable);
        assert!(!note.description.is_empty());
    }
}
