use axum::http::header::ALLOW;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bridge_core::invocation::InvocationError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce plain-text error responses. Full
/// details of invocation failures are logged by the orchestrator; the body
/// only carries the diagnostic line.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The endpoint only accepts `POST`.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Unreadable or malformed request body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The interpreter could not produce a successful result.
    #[error("{label} failed: {source}")]
    Invocation {
        label: &'static str,
        #[source]
        source: InvocationError,
    },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(ALLOW, "POST")],
                "method not allowed",
            )
                .into_response(),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),

            AppError::Invocation { label, source } => {
                tracing::debug!(reason = %source.reason(), "Translating invocation failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{label} failed: {}", source.diagnostic()),
                )
                    .into_response()
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred",
                )
                    .into_response()
            }
        }
    }
}
