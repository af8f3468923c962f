//! Child process supervision.
//!
//! [`run_command`] spawns a prepared [`Command`], feeds the payload to its
//! stdin, drains stdout and stderr concurrently, and waits for exit or for
//! the [`DeadlineScope`] to end. When the scope ends first the child's process
//! group is killed and the child is reaped before returning. When the child
//! exits on its own, the rest of its process group is killed as well, so
//! background helpers never outlive the invocation. Callers place the
//! child in its own process group (see [`super::orchestrator::build_command`]).

use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::deadline::{DeadlineScope, ScopeEnd};
use super::outcome::{InvocationError, InvocationOutcome, InvocationOutput};

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output beyond the limit is drained and discarded.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How long to wait for output pipes to close once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Spawn `cmd`, pipe `payload` to its stdin, and supervise it within `scope`.
///
/// `program` is only used for error messages.
pub async fn run_command(
    cmd: &mut Command,
    program: &str,
    payload: Bytes,
    scope: &DeadlineScope,
) -> InvocationOutcome {
    // `kill_on_drop(true)` covers every path that drops the child unexpectedly.
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|source| InvocationError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Captured now: `Child::id` returns `None` once the child is reaped.
    let pid = child.id();
    tracing::debug!(pid, program, payload_bytes = payload.len(), "Spawned child process");

    if let Some(stdin) = child.stdin.take() {
        tokio::spawn(write_stdin(stdin, payload, scope.token().clone()));
    }

    let readers = Readers::spawn(&mut child);

    let waited = tokio::select! {
        status = child.wait() => Ok(status),
        end = scope.ended() => Err(end),
    };

    match waited {
        Ok(Ok(status)) => {
            let duration = start.elapsed();
            // Helpers the child forked may still hold the output pipes open.
            #[cfg(unix)]
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            let (stdout, stderr) = readers
                .finish(Instant::now() + DRAIN_GRACE, Some(scope.token()))
                .await;

            if status.success() {
                Ok(InvocationOutput {
                    stdout,
                    stderr,
                    duration,
                })
            } else {
                Err(InvocationError::NonZeroExit {
                    status,
                    stdout,
                    stderr,
                })
            }
        }
        Ok(Err(err)) => {
            terminate(&mut child).await;
            readers.finish(Instant::now() + DRAIN_GRACE, None).await;
            Err(InvocationError::Io(err))
        }
        Err(end) => {
            terminate(&mut child).await;
            let (stdout, stderr) = readers.finish(Instant::now() + DRAIN_GRACE, None).await;

            match end {
                ScopeEnd::DeadlineElapsed => Err(InvocationError::Timeout {
                    timeout: scope.timeout(),
                    stdout,
                    stderr,
                }),
                ScopeEnd::Cancelled => Err(InvocationError::Cancelled { stdout, stderr }),
            }
        }
    }
}

/// Background tasks draining the child's stdout and stderr.
struct Readers {
    stdout: JoinHandle<Vec<u8>>,
    stderr: JoinHandle<Vec<u8>>,
    stop: CancellationToken,
}

impl Readers {
    fn spawn(child: &mut Child) -> Self {
        let stop = CancellationToken::new();
        Self {
            stdout: tokio::spawn(read_stream(child.stdout.take(), "stdout", stop.clone())),
            stderr: tokio::spawn(read_stream(child.stderr.take(), "stderr", stop.clone())),
            stop,
        }
    }

    /// Wait for both streams to close, at most until `until` or until
    /// `interrupt` is cancelled. Streams still open are then stopped and
    /// yield whatever was read so far.
    async fn finish(
        self,
        until: Instant,
        interrupt: Option<&CancellationToken>,
    ) -> (Bytes, String) {
        let Self {
            stdout,
            stderr,
            stop,
        } = self;

        let joined = async { (stdout.await, stderr.await) };
        tokio::pin!(joined);

        let stopper = async {
            tokio::select! {
                () = tokio::time::sleep_until(until) => {
                    tracing::warn!("Output pipe still open after the child exited; keeping what was read");
                }
                () = cancelled(interrupt) => {
                    tracing::debug!("Scope ended while draining child output");
                }
            }
            stop.cancel();
        };

        let (stdout, stderr) = tokio::select! {
            joined = &mut joined => joined,
            () = stopper => joined.await,
        };

        (
            Bytes::from(stdout.unwrap_or_default()),
            lossy(stderr.unwrap_or_default()),
        )
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Kill the child's process group and the child itself, then reap it.
///
/// Safe to call on a child that already exited.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        kill_process_group(pid);
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "Child already exited before kill");
    }

    match child.wait().await {
        Ok(status) => tracing::debug!(%status, "Reaped terminated child"),
        Err(e) => tracing::warn!(error = %e, "Failed to reap terminated child"),
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: `kill` has no memory-safety preconditions. The child leads its
    // own process group, so the group id equals its pid.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "Process group already gone"
        );
    }
}

/// Write the whole payload and close stdin, unless the scope ends first.
async fn write_stdin(mut stdin: ChildStdin, payload: Bytes, cancel: CancellationToken) {
    let write = async {
        stdin.write_all(&payload).await?;
        stdin.shutdown().await
    };

    tokio::select! {
        result = write => {
            // The child may legitimately exit without reading its input.
            if let Err(e) = result {
                tracing::debug!(error = %e, "Child closed stdin before reading the full payload");
            }
        }
        () = cancel.cancelled() => {}
    }
}

/// Read an output stream until EOF or `stop`, keeping at most
/// [`MAX_OUTPUT_BYTES`].
///
/// Bytes past the limit are still read so the child never blocks on a full
/// pipe.
async fn read_stream<R: AsyncRead + Unpin>(
    handle: Option<R>,
    stream: &'static str,
    stop: CancellationToken,
) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut handle) = handle else {
        return buf;
    };

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut discarded: u64 = 0;

    loop {
        let read = tokio::select! {
            biased;
            () = stop.cancelled() => break,
            read = handle.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                let keep = n.min(MAX_OUTPUT_BYTES - buf.len());
                buf.extend_from_slice(&chunk[..keep]);
                discarded += (n - keep) as u64;
            }
            Err(e) => {
                tracing::warn!(stream, error = %e, "Failed to read child output");
                break;
            }
        }
    }

    if discarded > 0 {
        tracing::warn!(
            stream,
            limit = MAX_OUTPUT_BYTES,
            discarded,
            "Child output truncated"
        );
    }

    buf
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
