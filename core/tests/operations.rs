use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use slipdesk_core::{
    Analyze, Humanize, HumanizeInput, InvocationError, Language, ModelClient, ModelRequest,
    OperationError, OperationName, ValidationError,
};

/// Replays a fixed reply and records every prompt it receives.
struct StubClient {
    reply: Result<Value, InvocationError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    fn replying(reply: Value) -> Arc<Self> {
        Self::with(Ok(reply))
    }

    fn failing(err: InvocationError) -> Arc<Self> {
        Self::with(Err(err))
    }

    fn with(reply: Result<Value, InvocationError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for StubClient {
    async fn invoke(&self, request: &ModelRequest) -> Result<Value, InvocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.rendered_prompt.clone());
        self.reply.clone()
    }
}

fn sam_to_jo() -> Value {
    json!({
        "senderName": "Sam",
        "recipient": "Jo",
        "message": "Call back about invoice 42",
        "messageContext": "Urgent",
    })
}

#[tokio::test]
async fn humanize_round_trip() {
    let stub = StubClient::replying(json!({ "humanizedMessage": "Quick note..." }));
    let humanize = Humanize::<StubClient>::new(stub.clone());

    let output = humanize.execute(&sam_to_jo()).await.unwrap();
    assert_eq!(output.humanized_message, "Quick note...");
    assert_eq!(stub.calls(), 1);

    let prompt = stub.last_prompt();
    for needle in ["Sam", "Jo", "Call back about invoice 42", "Urgent"] {
        assert!(prompt.contains(needle), "prompt lacks {needle:?}");
    }
}

#[tokio::test]
async fn humanize_missing_fields_never_reach_the_model() {
    for missing in ["senderName", "recipient", "message"] {
        let stub = StubClient::replying(json!({ "humanizedMessage": "unused" }));
        let humanize = Humanize::new(stub.clone());

        let mut input = sam_to_jo();
        input.as_object_mut().unwrap().remove(missing);

        let err = humanize.execute(&input).await.unwrap_err();
        match err {
            OperationError::InvalidInput { operation, details } => {
                assert_eq!(operation, OperationName::Humanize);
                assert_eq!(details.fields(), vec![missing]);
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert_eq!(stub.calls(), 0);
    }
}

#[tokio::test]
async fn analyze_rejects_out_of_range_partial_output() {
    let stub = StubClient::replying(json!({ "clarityScore": 15 }));
    let analyze = Analyze::new(stub.clone());

    let err = analyze
        .execute(&json!({ "message": "Meeting moved to 3pm" }))
        .await
        .unwrap_err();

    let OperationError::InvalidModelOutput { operation, details } = &err else {
        panic!("expected InvalidModelOutput, got {err:?}");
    };
    assert_eq!(*operation, OperationName::Analyze);
    assert!(details.iter().any(|e| matches!(e, ValidationError::MissingField { field } if field == "tone")));
    assert!(details.iter().any(|e| matches!(e, ValidationError::MissingField { field } if field == "suggestions")));
    assert!(details.iter().any(|e| matches!(
        e,
        ValidationError::RangeViolation { field, value, .. } if field == "clarityScore" && *value == 15.0
    )));
    assert!(err.is_retryable());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn analyze_output_stays_within_bounds() {
    for (score, ok) in [(1, true), (10, true), (0, false), (11, false)] {
        let stub = StubClient::replying(json!({
            "tone": "Neutral",
            "clarityScore": score,
            "suggestions": [],
        }));
        let result = Analyze::new(stub).execute(&json!({ "message": "ok" })).await;
        match result {
            Ok(output) => {
                assert!(ok, "score {score} should have been rejected");
                assert!((1.0..=10.0).contains(&output.clarity_score));
                assert!(output.suggestions.is_empty());
            }
            Err(OperationError::InvalidModelOutput { .. }) => assert!(!ok, "score {score} rejected"),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
}

#[tokio::test]
async fn non_numeric_score_is_not_coerced() {
    let stub = StubClient::replying(json!({
        "tone": "Casual",
        "clarityScore": "about eight",
        "suggestions": ["Be specific"],
    }));
    let err = Analyze::new(stub)
        .execute(&json!({ "message": "yo" }))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::InvalidModelOutput { .. }));
}

#[tokio::test]
async fn empty_analyze_message_is_invalid_input() {
    let stub = StubClient::replying(json!({}));
    let err = Analyze::new(stub.clone())
        .execute(&json!({ "message": "" }))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::InvalidInput { .. }));
    assert!(!err.is_retryable());
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn invocation_failures_propagate() {
    let cause = InvocationError::Timeout {
        after: Duration::from_secs(30),
    };
    let stub = StubClient::failing(cause.clone());
    let err = Humanize::new(stub.clone())
        .execute(&sam_to_jo())
        .await
        .unwrap_err();
    match err {
        OperationError::InvocationFailed { operation, cause: got } => {
            assert_eq!(operation, OperationName::Humanize);
            assert_eq!(got, cause);
        }
        other => panic!("expected InvocationFailed, got {other:?}"),
    }
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn unsupported_language_renders_as_english() {
    let stub = StubClient::replying(json!({ "humanizedMessage": "Quick note..." }));
    let humanize = Humanize::new(stub.clone());

    let mut french = sam_to_jo();
    french["language"] = json!("fr");
    humanize.execute(&french).await.unwrap();
    let french_prompt = stub.last_prompt();

    let mut english = sam_to_jo();
    english["language"] = json!("en");
    humanize.execute(&english).await.unwrap();

    assert_eq!(french_prompt, stub.last_prompt());
    assert!(french_prompt.contains("following language: English."));
}

#[tokio::test]
async fn typed_run_still_validates() {
    let stub = StubClient::replying(json!({ "humanizedMessage": "" }));
    let humanize = Humanize::new(stub.clone());
    let input = HumanizeInput {
        sender_name: "Sam".to_string(),
        recipient: "Jo".to_string(),
        message: "Call back".to_string(),
        message_context: String::new(),
        language: Language::Amharic,
    };

    let err = humanize.run(&input).await.unwrap_err();
    assert!(matches!(err, OperationError::InvalidModelOutput { .. }));
    assert!(stub.last_prompt().contains("Additional Context: N/A"));
    assert!(stub.last_prompt().contains("Amharic"));
}

#[tokio::test]
async fn analyze_and_humanize_run_concurrently() {
    let analyze_stub = StubClient::replying(json!({
        "tone": "Urgent",
        "clarityScore": 8.5,
        "suggestions": ["Mention the due date"],
    }));
    let humanize_stub = StubClient::replying(json!({ "humanizedMessage": "Just a heads up..." }));
    let analyze = Analyze::new(analyze_stub.clone() as Arc<dyn ModelClient>);
    let humanize = Humanize::new(humanize_stub.clone() as Arc<dyn ModelClient>);

    let analyze_input = json!({ "message": "Call back about invoice 42", "language": "am" });
    let humanize_input = sam_to_jo();
    let (analysis, summary) = tokio::join!(
        analyze.execute(&analyze_input),
        humanize.execute(&humanize_input),
    );

    let analysis = analysis.unwrap();
    assert_eq!(analysis.tone, "Urgent");
    assert_eq!(analysis.clarity_score, 8.5);
    assert_eq!(summary.unwrap().humanized_message, "Just a heads up...");
    assert_eq!((analyze_stub.calls(), humanize_stub.calls()), (1, 1));
}
