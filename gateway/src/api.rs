use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use slipdesk_core::{message_context, HumanizeOutput, SlipStatus};
use tracing::info;

use crate::notify::Notification;

/// `Json<T>` whose rejections (bad syntax, wrong content type, wrong shape)
/// answer with the same notification body as operation failures.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Notification>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                info!("unreadable request body: {}", rejection.body_text());
                let (status, notification) = Notification::from_rejection(&rejection);
                Err((status, Json(notification)))
            }
        }
    }
}

// Input: humanize fields as the form sends them, plus the checked statuses.
// Everything except `statuses` is handed to the operation untouched.
#[derive(Debug, Deserialize)]
pub struct HumanizeRequest {
    #[serde(default)]
    pub statuses: Vec<SlipStatus>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl HumanizeRequest {
    /// Raw operation input. `messageContext` is composed from the statuses
    /// only when the caller did not send one.
    pub fn into_input(self) -> Value {
        let mut fields = self.fields;
        let has_context = fields
            .get("messageContext")
            .is_some_and(|v| !v.is_null());
        if !has_context && !self.statuses.is_empty() {
            fields.insert(
                "messageContext".to_string(),
                Value::String(message_context(&self.statuses)),
            );
        }
        Value::Object(fields)
    }
}

// Output: a suggested rewrite. The UI only swaps it in after explicit approval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeResponse {
    #[serde(flatten)]
    pub suggestion: HumanizeOutput,
    pub requires_approval: bool,
}

impl From<HumanizeOutput> for HumanizeResponse {
    fn from(suggestion: HumanizeOutput) -> Self {
        Self {
            suggestion,
            requires_approval: true,
        }
    }
}
