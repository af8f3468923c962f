//! Per-request invocation entry point.
//!
//! [`invoke`] runs exactly one child process for one payload, bounded by the
//! caller's cancellation token and the configured timeout, and logs the
//! outcome. Nothing is retried or pooled.

use bytes::Bytes;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::deadline::DeadlineScope;
use super::outcome::InvocationOutcome;
use super::subprocess;
use super::target::{InvocationConfig, Runtime};

/// Build the command for `runtime`, leading its own process group on unix.
pub fn build_command(runtime: &impl Runtime) -> Command {
    let mut cmd = std::process::Command::new(runtime.program());
    cmd.args(runtime.args());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    Command::from(cmd)
}

/// Run the configured interpreter once with `payload` on its stdin.
///
/// The child is killed when `cancel` fires or `config.timeout` elapses,
/// whichever happens first, and is always reaped before this returns.
pub async fn invoke(
    config: &InvocationConfig,
    payload: Bytes,
    cancel: &CancellationToken,
) -> InvocationOutcome {
    let target = &config.target;
    let scope = DeadlineScope::new(cancel, config.timeout);
    let mut cmd = build_command(target);

    tracing::debug!(
        runtime = target.name(),
        program = target.program(),
        args = ?target.args(),
        timeout = ?config.timeout,
        "Starting invocation"
    );

    let outcome = subprocess::run_command(&mut cmd, target.program(), payload, &scope).await;

    match &outcome {
        Ok(output) => {
            tracing::info!(
                runtime = target.name(),
                duration_ms = output.duration.as_millis() as u64,
                stdout_bytes = output.stdout.len(),
                "Invocation completed"
            );
            tracing::debug!(
                stdout = %String::from_utf8_lossy(&output.stdout),
                stderr = %output.stderr,
                "Invocation output"
            );
            if !is_json(&output.stdout) {
                tracing::warn!("Invocation stdout is not valid JSON; returning it unchanged");
            }
        }
        Err(err) => {
            tracing::error!(
                runtime = target.name(),
                reason = %err.reason(),
                error = %err,
                stderr = %err.stderr(),
                stdout = %String::from_utf8_lossy(err.stdout()),
                "Invocation failed"
            );
        }
    }

    outcome
}

/// Whether `bytes` hold exactly one well-formed JSON document.
pub fn is_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}
