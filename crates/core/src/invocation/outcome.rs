//! Result types produced by a single invocation.

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use bytes::Bytes;

/// Outcome of running the interpreter once.
pub type InvocationOutcome = Result<InvocationOutput, InvocationError>;

/// Captured output of a child that exited with status zero.
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    /// Standard output, verbatim.
    pub stdout: Bytes,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

/// Coarse classification of an [`InvocationError`], used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Cancelled,
    NonZeroExit,
    SpawnError,
    IoError,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::NonZeroExit => "nonzero_exit",
            Self::SpawnError => "spawn_error",
            Self::IoError => "io_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ways an invocation can fail.
///
/// Variants that observed a running process keep whatever it wrote so the
/// operator log can show it.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// The configured timeout elapsed and the process was killed.
    #[error("timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        stdout: Bytes,
        stderr: String,
    },

    /// The request went away before the process finished; it was killed.
    #[error("cancelled before the process finished")]
    Cancelled { stdout: Bytes, stderr: String },

    /// The process ran to completion with a failing status.
    #[error("{status}")]
    NonZeroExit {
        status: ExitStatus,
        stdout: Bytes,
        stderr: String,
    },

    /// The program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the process failed.
    #[error("I/O error while waiting for the process: {0}")]
    Io(#[source] std::io::Error),
}

impl InvocationError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Timeout { .. } => FailureReason::Timeout,
            Self::Cancelled { .. } => FailureReason::Cancelled,
            Self::NonZeroExit { .. } => FailureReason::NonZeroExit,
            Self::Spawn { .. } => FailureReason::SpawnError,
            Self::Io(_) => FailureReason::IoError,
        }
    }

    /// Captured standard error, when the process got far enough to write any.
    pub fn stderr(&self) -> &str {
        match self {
            Self::Timeout { stderr, .. }
            | Self::Cancelled { stderr, .. }
            | Self::NonZeroExit { stderr, .. } => stderr,
            Self::Spawn { .. } | Self::Io(_) => "",
        }
    }

    /// Captured standard output, when the process got far enough to write any.
    pub fn stdout(&self) -> &[u8] {
        match self {
            Self::Timeout { stdout, .. }
            | Self::Cancelled { stdout, .. }
            | Self::NonZeroExit { stdout, .. } => stdout,
            Self::Spawn { .. } | Self::Io(_) => &[],
        }
    }

    /// Concise caller-facing message.
    ///
    /// Timeouts and cancellations describe themselves, followed by the first
    /// non-blank stderr line when there is one. Other failures use that line
    /// alone and fall back to the error message.
    pub fn diagnostic(&self) -> String {
        let line = diagnostic_line(self.stderr());
        match (self, line) {
            (Self::Timeout { .. } | Self::Cancelled { .. }, Some(line)) => format!("{self}: {line}"),
            (_, Some(line)) => line.to_string(),
            (_, None) => self.to_string(),
        }
    }
}

/// First line of `text` containing anything other than whitespace, trimmed.
pub fn diagnostic_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}
