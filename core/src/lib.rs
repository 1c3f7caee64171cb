//! Typed AI operations for the message-slip desk.
//!
//! Each operation validates its input against a fixed schema, renders a
//! prompt, makes one call to the generative model and validates the reply
//! before handing back a typed result.

pub mod config;
pub mod error;
pub mod llm;
pub mod operation;
pub mod prompt;
pub mod schema;
pub mod slip;

pub use config::ModelConfig;
pub use error::{InvocationError, OperationError, ValidationError, ValidationErrors};
pub use llm::{ModelClient, ModelRequest, OpenAiClient};
pub use operation::{
    Analyze, AnalyzeInput, AnalyzeOutput, Humanize, HumanizeInput, HumanizeOutput, Operation, Stage,
};
pub use prompt::Language;
pub use schema::{OperationName, SchemaRegistry};
pub use slip::{message_context, SlipStatus};
