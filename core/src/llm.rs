use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::InvocationError;
use crate::schema::Shape;

const SYSTEM_INSTRUCTION: &str = "Return a single JSON object only. No prose or code fences.";

/// One model round trip: the rendered prompt plus the shape the reply must take.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub rendered_prompt: String,
    pub output_schema: &'static Shape,
}

/// The generative-model capability operations depend on.
///
/// Implementations make exactly one round trip per call and return the raw
/// JSON object the service produced. Field-level validation is the caller's job.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<Value, InvocationError>;
}

/// `ModelClient` backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(config: &ModelConfig) -> Self {
        let mut openai = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(base) = &config.base_url {
            openai = openai.with_api_base(base.clone());
        }
        // One round trip per call: rate-limit replies surface instead of being retried.
        let client = Client::with_config(openai).with_backoff(ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..ExponentialBackoff::default()
        });

        info!("Model client ready. Model: {}", config.model);
        Self {
            client,
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(&ModelConfig::from_env()?))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Connectivity check used at startup.
    pub async fn ping(&self) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content("Hello! Reply with 'System Online'.")
                    .build()?,
            )])
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| anyhow::anyhow!("no answer within {}s", self.timeout.as_secs()))??;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    fn build_request(&self, request: &ModelRequest) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let shape = request.output_schema;
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(SYSTEM_INSTRUCTION)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(request.rendered_prompt.as_str())
                        .build()?,
                ),
            ])
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: shape.name.to_string(),
                    schema: Some(shape.to_json_schema()),
                    strict: None,
                },
            })
            .build()
    }

    fn classify(&self, err: OpenAIError) -> InvocationError {
        match err {
            OpenAIError::Reqwest(e) if e.is_timeout() => InvocationError::Timeout { after: self.timeout },
            OpenAIError::JSONDeserialize(e) => {
                InvocationError::MalformedResponse(format!("completion envelope: {e}"))
            }
            OpenAIError::ApiError(api) => InvocationError::ServiceUnavailable(api.message),
            other => InvocationError::ServiceUnavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn invoke(&self, request: &ModelRequest) -> Result<Value, InvocationError> {
        let payload = self
            .build_request(request)
            .map_err(|e| InvocationError::ServiceUnavailable(format!("request rejected: {e}")))?;

        debug!(schema = request.output_schema.name, model = %self.model, "sending completion request");
        let response = match tokio::time::timeout(self.timeout, self.client.chat().create(payload)).await {
            Err(_) => {
                warn!("model call exceeded {}s", self.timeout.as_secs());
                return Err(InvocationError::Timeout { after: self.timeout });
            }
            Ok(Err(err)) => return Err(self.classify(err)),
            Ok(Ok(response)) => response,
        };

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InvocationError::ServiceUnavailable("completion had no choices".to_string()))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| InvocationError::MalformedResponse("completion had no content".to_string()))?;

        parse_reply(&content)
    }
}

/// Extract the JSON object from a model reply, tolerating code fences and
/// surrounding prose.
pub fn parse_reply(raw: &str) -> Result<Value, InvocationError> {
    let cleaned = strip_code_fences(raw);
    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(err) => extract_json_from_text(&cleaned)
            .ok_or_else(|| InvocationError::MalformedResponse(format!("reply is not JSON: {err}")))?,
    };
    if !value.is_object() {
        return Err(InvocationError::MalformedResponse(
            "reply is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines.first().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

fn extract_json_from_text(raw: &str) -> Option<Value> {
    for (idx, ch) in raw.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut deserializer = serde_json::Deserializer::from_str(&raw[idx..]);
        if let Ok(value) = Value::deserialize(&mut deserializer) {
            return Some(value);
        }
    }
    None
}
