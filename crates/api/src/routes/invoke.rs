use axum::routing::any;
use axum::Router;

use crate::handlers::invoke;
use crate::state::AppState;

/// Every method reaches the handler so the validator owns the 405 response.
pub fn router() -> Router<AppState> {
    Router::new().route("/invoke", any(invoke::invoke))
}
