use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{OperationError, ValidationError, ValidationErrors};
use crate::llm::{ModelClient, ModelRequest};
use crate::prompt::{self, Language, PromptInput};
use crate::schema::{self, OperationName, OperationSchema, SchemaRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeInput {
    pub message: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutput {
    pub tone: String,
    pub clarity_score: f64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeInput {
    pub sender_name: String,
    pub recipient: String,
    pub message: String,
    pub message_context: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeOutput {
    pub humanized_message: String,
}

/// Per-invocation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    InputValidating,
    Rendering,
    Invoking,
    OutputValidating,
    Succeeded,
    Failed,
}

impl Stage {
    /// The stage that follows on success. Terminal stages have none.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::InputValidating),
            Stage::InputValidating => Some(Stage::Rendering),
            Stage::Rendering => Some(Stage::Invoking),
            Stage::Invoking => Some(Stage::OutputValidating),
            Stage::OutputValidating => Some(Stage::Succeeded),
            Stage::Succeeded | Stage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Walks one invocation through `Stage`, logging each transition.
struct Progress {
    operation: OperationName,
    stage: Stage,
}

impl Progress {
    fn start(operation: OperationName) -> Self {
        Self {
            operation,
            stage: Stage::Idle,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            debug!(operation = %self.operation, from = %self.stage, to = %next, "stage");
            self.stage = next;
        }
    }

    fn fail(&mut self, err: OperationError) -> OperationError {
        warn!(operation = %self.operation, stage = %self.stage, error = %err, "operation failed");
        self.stage = Stage::Failed;
        err
    }
}

/// The static description of one operation: its name, record types and prompt.
pub trait Flow: Send + Sync + 'static {
    type Input: Serialize + DeserializeOwned + Send + Sync;
    type Output: DeserializeOwned + Send;

    const NAME: OperationName;

    fn render(input: &Self::Input) -> String;

    fn schema() -> &'static OperationSchema {
        SchemaRegistry::get(Self::NAME)
    }
}

pub struct AnalyzeFlow;

impl Flow for AnalyzeFlow {
    type Input = AnalyzeInput;
    type Output = AnalyzeOutput;

    const NAME: OperationName = OperationName::Analyze;

    fn render(input: &AnalyzeInput) -> String {
        prompt::render(PromptInput::Analyze(input))
    }
}

pub struct HumanizeFlow;

impl Flow for HumanizeFlow {
    type Input = HumanizeInput;
    type Output = HumanizeOutput;

    const NAME: OperationName = OperationName::Humanize;

    fn render(input: &HumanizeInput) -> String {
        prompt::render(PromptInput::Humanize(input))
    }
}

/// A named, schema-bound unit of work wrapping one model round trip.
///
/// Holds no state besides the injected client, so one instance can serve
/// any number of concurrent calls.
pub struct Operation<F, C: ?Sized = dyn ModelClient> {
    client: Arc<C>,
    _flow: PhantomData<fn() -> F>,
}

pub type Analyze<C = dyn ModelClient> = Operation<AnalyzeFlow, C>;
pub type Humanize<C = dyn ModelClient> = Operation<HumanizeFlow, C>;

impl<F, C: ?Sized> Clone for Operation<F, C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            _flow: PhantomData,
        }
    }
}

impl<F: Flow, C: ModelClient + ?Sized> Operation<F, C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            _flow: PhantomData,
        }
    }

    pub fn name(&self) -> OperationName {
        F::NAME
    }

    /// Validate `raw`, render, invoke the model once and validate its reply.
    pub async fn execute(&self, raw: &Value) -> Result<F::Output, OperationError> {
        let schema = F::schema();
        let mut progress = Progress::start(F::NAME);

        progress.advance();
        let input: F::Input = schema::validate(raw, &schema.input).map_err(|details| {
            progress.fail(OperationError::InvalidInput {
                operation: F::NAME,
                details,
            })
        })?;

        progress.advance();
        let request = ModelRequest {
            rendered_prompt: F::render(&input),
            output_schema: &schema.output,
        };

        progress.advance();
        let reply = self.client.invoke(&request).await.map_err(|cause| {
            progress.fail(OperationError::InvocationFailed {
                operation: F::NAME,
                cause,
            })
        })?;

        progress.advance();
        let output: F::Output = schema::validate(&reply, &schema.output).map_err(|details| {
            progress.fail(OperationError::InvalidModelOutput {
                operation: F::NAME,
                details,
            })
        })?;

        progress.advance();
        info!(operation = %F::NAME, "operation succeeded");
        Ok(output)
    }

    /// Typed entry point; the input still goes through schema validation.
    pub async fn run(&self, input: &F::Input) -> Result<F::Output, OperationError> {
        let raw = serde_json::to_value(input).map_err(|err| OperationError::InvalidInput {
            operation: F::NAME,
            details: ValidationErrors(vec![ValidationError::TypeMismatch {
                field: "$".to_string(),
                expected: format!("serializable input ({err})"),
            }]),
        })?;
        self.execute(&raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_run_in_order_and_end_terminal() {
        let mut stage = Stage::Idle;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Idle,
                Stage::InputValidating,
                Stage::Rendering,
                Stage::Invoking,
                Stage::OutputValidating,
                Stage::Succeeded,
            ]
        );
        assert!(Stage::Failed.is_terminal());
        assert_eq!(Stage::Failed.next(), None);
    }

    #[test]
    fn records_use_camel_case_wire_names() {
        let output = AnalyzeOutput {
            tone: "Friendly".to_string(),
            clarity_score: 9.0,
            suggestions: vec!["Add a callback number".to_string()],
        };
        let wire = serde_json::to_value(&output).unwrap();
        assert!(wire.get("clarityScore").is_some());

        let input: HumanizeInput = serde_json::from_value(serde_json::json!({
            "senderName": "Sam",
            "recipient": "Jo",
            "message": "hi",
            "messageContext": "",
        }))
        .unwrap();
        assert_eq!(input.language, Language::English);
    }
}
