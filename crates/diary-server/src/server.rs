//! HTTP server for the incident diary.
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - Receiving alert events from the alerting source
//! - Receiving Slack interactivity callbacks (button clicks, form submissions)

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use diary::ack::ACK_FORM_CALLBACK_ID;
use diary::{
    AckError, AckWorkflow, AlertEvent, BlockActionCallback, DispatchPath, IncidentDispatcher,
};
use diary_notify::{BlockActionsPayload, InteractionPayload, ViewSubmissionPayload};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Interaction payloads are small; alert bodies carry descriptions.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server state shared across handlers.
pub struct AppState {
    pub dispatcher: IncidentDispatcher,
    pub ack: AckWorkflow,
}

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/alerts", post(alert_handler))
        .route("/api/slack/interactions", post(interaction_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to bind or stops unexpectedly.
pub async fn run_server(state: Arc<AppState>, addr: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Incident diary listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Response to an alert event.
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertResponse {
    /// "ok" when every step succeeded, "partial" otherwise
    pub status: String,
    pub path: DispatchPath,
    pub root_message_ts: Option<String>,
    pub reply_ts: Option<String>,
    /// Failed steps as "step: error"
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: String,
}

/// Slack posts interactions as a form with a single JSON `payload` field.
#[derive(Debug, Deserialize)]
struct InteractionForm {
    payload: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn alert_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AlertEvent>,
) -> Response {
    match state.dispatcher.process_incident(&event).await {
        Ok(report) => {
            let response = AlertResponse {
                status: if report.is_complete() { "ok" } else { "partial" }.to_string(),
                path: report.path,
                root_message_ts: report.root_message_ts,
                reply_ts: report.reply_ts,
                errors: report.failures.iter().map(ToString::to_string).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Rejected alert event");
            bad_request(e.to_string())
        }
    }
}

async fn interaction_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InteractionForm>,
) -> Response {
    let payload = match InteractionPayload::parse(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Unparseable interaction payload");
            return bad_request(e.to_string());
        }
    };

    let result = match payload {
        InteractionPayload::BlockActions(payload) => handle_block_actions(&state, &payload).await,
        InteractionPayload::ViewSubmission(payload) => {
            handle_view_submission(&state, &payload).await
        }
        InteractionPayload::Unsupported => {
            debug!("Ignoring unsupported interaction type");
            Ok(())
        }
    };

    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(AckError::MalformedCallback(reason)) => {
            warn!(reason = %reason, "Malformed interaction callback");
            bad_request(reason)
        }
        Err(e) => {
            warn!(error = %e, "Acknowledgment aborted");
            StatusCode::OK.into_response()
        }
    }
}

async fn handle_block_actions(
    state: &AppState,
    payload: &BlockActionsPayload,
) -> Result<(), AckError> {
    let callback = BlockActionCallback::try_from(payload)?;
    let report = state.ack.ack_message(&callback).await?;
    debug!(outcome = ?report.outcome, failures = report.failures.len(), "Handled button click");
    Ok(())
}

async fn handle_view_submission(
    state: &AppState,
    payload: &ViewSubmissionPayload,
) -> Result<(), AckError> {
    if payload.view.callback_id != ACK_FORM_CALLBACK_ID {
        debug!(callback_id = %payload.view.callback_id, "Ignoring submission of unknown view");
        return Ok(());
    }

    let (channel, message_ts) = payload.view.message_ref().ok_or_else(|| {
        AckError::MalformedCallback("view metadata does not reference a message".into())
    })?;
    let report = state
        .ack
        .submit_ack_form(&payload.view.state, message_ts, channel)
        .await?;
    debug!(outcome = ?report.outcome, failures = report.failures.len(), "Handled form submission");
    Ok(())
}

fn bad_request(error: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            status: "error",
            error,
        }),
    )
        .into_response()
}
