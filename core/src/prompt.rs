//! Prompt rendering for each operation.
//!
//! Rendering is pure: no validation, no clock, no randomness. Input is
//! expected to have passed schema validation already.

use serde::{Deserialize, Serialize};

use crate::operation::{AnalyzeInput, HumanizeInput};

/// Shown in place of an empty or absent optional value.
pub const PLACEHOLDER: &str = "N/A";

/// Language of the model's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "am")]
    Amharic,
}

impl Language {
    /// Absent or unrecognized codes resolve to English.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("am") => Language::Amharic,
            _ => Language::English,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Amharic => "am",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Amharic => "Amharic",
        }
    }
}

/// Borrowed input of any operation, for name-dispatched rendering.
#[derive(Debug, Clone, Copy)]
pub enum PromptInput<'a> {
    Analyze(&'a AnalyzeInput),
    Humanize(&'a HumanizeInput),
}

pub fn render(input: PromptInput<'_>) -> String {
    match input {
        PromptInput::Analyze(input) => render_analyze(input),
        PromptInput::Humanize(input) => render_humanize(input),
    }
}

pub fn render_analyze(input: &AnalyzeInput) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        "You are an expert communication assistant. Your task is to analyze the following message for its tone, clarity, and effectiveness.",
    );
    out.push('\n');
    push_line(
        &mut out,
        &format!(
            "Provide the analysis in the following language: {}.",
            input.language.display_name()
        ),
    );
    out.push('\n');
    push_line(&mut out, "Message to Analyze:");
    push_line(&mut out, &format!("\"{}\"", input.message));
    out.push('\n');
    push_line(&mut out, "Provide the following analysis:");
    push_line(
        &mut out,
        "1. Tone: Identify the primary tone of the message. Examples: Formal, Casual, Urgent, Anxious, Friendly, Neutral.",
    );
    push_line(
        &mut out,
        "2. Clarity Score: Rate the message on a scale of 1 to 10, where 1 is \"very confusing\" and 10 is \"perfectly clear and concise.\"",
    );
    push_line(
        &mut out,
        "3. Suggestions: Offer a few brief, actionable suggestions for how to improve the message. If the message is already excellent, you can provide fewer suggestions or simply state that it's well-written. Focus on clarity, impact, and professionalism.",
    );
    out.push('\n');
    push_line(
        &mut out,
        "Return the analysis in the specified JSON format, with all text translated to the requested language.",
    );
    out
}

pub fn render_humanize(input: &HumanizeInput) -> String {
    let recipient = &input.recipient;
    let mut out = String::new();
    push_line(
        &mut out,
        "You are a helpful office assistant. Your task is to rewrite a short, formal message into a more natural, human-friendly summary.",
    );
    push_line(
        &mut out,
        &format!("The message is for {recipient} from {}.", input.sender_name),
    );
    out.push('\n');
    push_line(
        &mut out,
        &format!(
            "Please provide the summary in the following language: {}.",
            input.language.display_name()
        ),
    );
    out.push('\n');
    push_line(&mut out, "Original Message:");
    push_line(&mut out, &format!("\"{}\"", input.message));
    out.push('\n');
    push_line(
        &mut out,
        &format!(
            "Additional Context: {}",
            or_placeholder(&input.message_context)
        ),
    );
    out.push('\n');
    push_line(
        &mut out,
        &format!(
            "Rewrite this message as a brief, friendly summary as if you were telling {recipient} about it in person."
        ),
    );
    push_line(
        &mut out,
        "Incorporate the additional context naturally into your summary. For example, if the context is \"Urgent, Please call\", make sure the summary reflects that.",
    );
    push_line(
        &mut out,
        "Start with a phrase like \"Just a heads up...\" or \"Quick note...\".",
    );
    push_line(&mut out, "Keep it concise and clear.");
    push_line(
        &mut out,
        "Do not add any information that is not in the original message.",
    );
    out.push('\n');
    push_line(&mut out, "Example (for English):");
    push_line(
        &mut out,
        "Original: \"Please call Mr. Smith at 555-1234 regarding the quarterly report.\"",
    );
    push_line(&mut out, "Context: \"Urgent, Please call\"");
    push_line(
        &mut out,
        "Summary: \"Quick note - Mr. Smith called about the quarterly report. He said it's urgent and would like you to call him back at 555-1234.\"",
    );
    out
}

/// Only `messageContext` may legitimately be empty; required fields render as given.
fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
