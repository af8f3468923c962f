//! Handler for the `/invoke` endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use bridge_core::invocation::{self, Runtime};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::validation;

/// ANY /invoke
///
/// Validate the JSON payload, run the configured interpreter once with it on
/// stdin, and return its stdout as the response body.
///
/// The invocation runs on its own task. If the client disconnects, this
/// future is dropped, the guard cancels the request token, and that task
/// kills and reaps the child.
pub async fn invoke(
    State(state): State<AppState>,
    method: Method,
    body: Body,
) -> AppResult<Response> {
    let payload =
        validation::read_json_payload(&method, body, state.config.max_body_bytes).await?;

    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let config = Arc::clone(&state.config);
    let label = config.invocation.target.label();

    let task = tokio::spawn(async move {
        invocation::invoke(&config.invocation, payload, &cancel).await
    });

    let output = task
        .await
        .map_err(|e| AppError::InternalError(format!("invocation task failed: {e}")))?
        .map_err(|source| AppError::Invocation { label, source })?;

    Ok(([(CONTENT_TYPE, "application/json")], output.stdout).into_response())
}
