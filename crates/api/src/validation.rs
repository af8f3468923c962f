//! Request validation for `/invoke`.

use axum::body::Body;
use axum::http::Method;
use bridge_core::invocation::is_json;
use bytes::Bytes;

use crate::error::{AppError, AppResult};

/// Response body for payloads that are not a single JSON document.
pub const INVALID_JSON_MESSAGE: &str = "invalid JSON payload";

/// Check the method, then read and syntax-check the whole body.
///
/// The body is consumed exactly once and dropped on every path. For non-POST
/// methods it is never polled.
pub async fn read_json_payload(method: &Method, body: Body, limit: usize) -> AppResult<Bytes> {
    if *method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let payload = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read request body: {e}")))?;

    if !is_json(&payload) {
        return Err(AppError::BadRequest(INVALID_JSON_MESSAGE.to_string()));
    }

    Ok(payload)
}
