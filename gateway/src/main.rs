mod api;
mod notify;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{HumanizeRequest, HumanizeResponse, Payload};
use crate::notify::Notification;
use slipdesk_core::{Analyze, AnalyzeOutput, Humanize, ModelClient, OpenAiClient, OperationError};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// Both operations share one model client; neither keeps per-call state.
#[derive(Clone)]
struct AppState {
    analyze: Analyze,
    humanize: Humanize,
}

impl AppState {
    fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            analyze: Analyze::new(Arc::clone(&client)),
            humanize: Humanize::new(client),
        }
    }
}

type Rejection = (StatusCode, Json<Notification>);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("Slipdesk Gateway Initializing...");

    let client = OpenAiClient::from_env().context("failed to configure model client")?;
    match client.ping().await {
        Ok(msg) => info!("Model Status: {}", msg.trim()),
        Err(e) => warn!("Model is configured but unresponsive: {}", e),
    }

    let state = AppState::new(Arc::new(client));
    let app = router(state);

    let addr = std::env::var("SLIPDESK_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway listening on {}...", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_message))
        .route("/humanize", post(humanize_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// --- HANDLERS ---

async fn health_check() -> &'static str {
    "Slipdesk Gateway: Operational"
}

async fn analyze_message(
    State(state): State<AppState>,
    Payload(payload): Payload<Value>,
) -> Result<Json<AnalyzeOutput>, Rejection> {
    let output = state.analyze.execute(&payload).await.map_err(reject)?;
    info!(
        "Analysis ready: tone '{}', clarity {}, {} suggestions",
        output.tone,
        output.clarity_score,
        output.suggestions.len()
    );
    Ok(Json(output))
}

async fn humanize_message(
    State(state): State<AppState>,
    Payload(payload): Payload<HumanizeRequest>,
) -> Result<Json<HumanizeResponse>, Rejection> {
    let input = payload.into_input();
    let output = state.humanize.execute(&input).await.map_err(reject)?;
    info!("Rewrite ready ({} chars), awaiting approval", output.humanized_message.len());
    Ok(Json(output.into()))
}

fn reject(err: OperationError) -> Rejection {
    let (status, notification) = Notification::from_error(&err);
    if status.is_server_error() {
        error!("{} failed: {}", err.operation(), err);
    } else {
        info!("{} rejected input: {}", err.operation(), err);
    }
    (status, Json(notification))
}
