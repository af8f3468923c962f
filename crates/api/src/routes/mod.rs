pub mod health;
pub mod invoke;

use axum::Router;

use crate::state::AppState;

/// Build the full route tree.
///
/// ```text
/// /health          GET   service health
/// /invoke          POST  forward payload to the interpreter (other methods: 405)
/// ```
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(invoke::router())
}
