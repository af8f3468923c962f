#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use bridge_api::config::ServerConfig;
use bridge_api::router::build_app_router;
use bridge_api::state::AppState;
use bridge_core::invocation::{InvocationConfig, InvocationTarget, ScriptSource, ScriptTarget};

/// Write `body` to a temporary `.sh` file.
pub fn write_temp_script(body: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::Builder::new()
        .suffix(".sh")
        .tempfile()
        .expect("create temp file");
    write!(f, "{body}").expect("write body");
    f
}

/// Build a test `ServerConfig` whose interpreter is `sh <script>`.
///
/// The script variant passes the script file as the only argument, so `sh`
/// stands in for `node` without any extra flags.
pub fn test_config(script: &Path, timeout: Duration) -> ServerConfig {
    let mut target = ScriptTarget::new(ScriptSource::File(script.to_path_buf()));
    target.program = "sh".to_string();

    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 8080,
        read_timeout: Duration::from_secs(10),
        write_timeout: Duration::from_secs(60),
        max_body_bytes: 1024 * 1024,
        invocation: InvocationConfig {
            timeout,
            target: InvocationTarget::Script(target),
        },
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(config: ServerConfig) -> Router {
    build_app_router(AppState::new(config))
}

/// Send a request with an arbitrary method and raw body.
pub async fn send(app: Router, method: Method, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw body to `/invoke`.
pub async fn post_invoke(app: Router, body: impl Into<Body>) -> Response<Body> {
    send(app, Method::POST, "/invoke", body).await
}

/// GET `uri` with an empty body.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a response body into a UTF-8 string.
pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8 body")
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

/// Lines appended to `path` so far (0 if the file does not exist).
pub fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}
