//! Invocation configuration and command-line construction.
//!
//! An [`InvocationConfig`] is built once at startup and shared read-only by
//! every request. Its [`InvocationTarget`] decides which interpreter runs and
//! with which arguments; argument lists are derived deterministically from it.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default program for the SAM variant.
pub const DEFAULT_SAM_PROGRAM: &str = "sam";

/// Default program for the script variant.
pub const DEFAULT_NODE_PROGRAM: &str = "node";

/// Immutable per-process invocation settings.
#[derive(Debug, Clone)]
pub struct InvocationConfig {
    /// Upper bound on a single child process's lifetime.
    pub timeout: Duration,
    /// What to run.
    pub target: InvocationTarget,
}

/// Implemented by each interpreter variant to describe its command line.
pub trait Runtime {
    /// Program name or path handed to the OS.
    fn program(&self) -> &str;

    /// Arguments following the program, in order.
    fn args(&self) -> Vec<OsString>;

    /// Human-readable name used in failure messages.
    fn label(&self) -> &'static str;
}

/// The interpreter to invoke for each request.
#[derive(Debug, Clone)]
pub enum InvocationTarget {
    Sam(SamTarget),
    Script(ScriptTarget),
}

impl InvocationTarget {
    /// Short runtime identifier (`sam` or `node`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sam(_) => "sam",
            Self::Script(_) => "node",
        }
    }
}

impl Runtime for InvocationTarget {
    fn program(&self) -> &str {
        match self {
            Self::Sam(sam) => sam.program(),
            Self::Script(script) => script.program(),
        }
    }

    fn args(&self) -> Vec<OsString> {
        match self {
            Self::Sam(sam) => sam.args(),
            Self::Script(script) => script.args(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Sam(sam) => sam.label(),
            Self::Script(script) => script.label(),
        }
    }
}

/// `sam local invoke` against a single function of a SAM template.
#[derive(Debug, Clone)]
pub struct SamTarget {
    pub program: String,
    pub function: String,
    pub template: PathBuf,
    /// Optional JSON file of environment overrides (`--env-vars`).
    pub env_vars: Option<PathBuf>,
}

impl SamTarget {
    /// Build a target using the default `sam` program.
    pub fn new(function: impl Into<String>, template: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_SAM_PROGRAM.to_string(),
            function: function.into(),
            template: template.into(),
            env_vars: None,
        }
    }
}

impl Runtime for SamTarget {
    fn program(&self) -> &str {
        &self.program
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "local".into(),
            "invoke".into(),
            self.function.clone().into(),
            "--template".into(),
            self.template.clone().into(),
            "--event".into(),
            "-".into(),
        ];
        if let Some(env_vars) = &self.env_vars {
            args.push("--env-vars".into());
            args.push(env_vars.clone().into());
        }
        args
    }

    fn label(&self) -> &'static str {
        "sam local invoke"
    }
}

/// Where the script variant's JavaScript comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Evaluated with `-e`.
    Inline(String),
    /// Passed as the entry-point path.
    File(PathBuf),
}

impl ScriptSource {
    /// Resolve the two mutually exclusive options into a single source.
    ///
    /// Empty values count as unset. Exactly one must remain.
    pub fn from_options(
        inline: Option<String>,
        file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let inline = inline.filter(|s| !s.is_empty());
        let file = file.filter(|p| !p.as_os_str().is_empty());

        match (inline, file) {
            (Some(script), None) => Ok(Self::Inline(script)),
            (None, Some(path)) => Ok(Self::File(path)),
            (Some(_), Some(_)) => Err(ConfigError::ScriptSourceConflict),
            (None, None) => Err(ConfigError::ScriptSourceMissing),
        }
    }
}

/// A Node.js (or compatible) runtime running one script per request.
#[derive(Debug, Clone)]
pub struct ScriptTarget {
    pub program: String,
    pub source: ScriptSource,
    /// Optional dotenv file loaded by the runtime (`--env-file`).
    pub env_file: Option<PathBuf>,
}

impl ScriptTarget {
    /// Build a target using the default `node` program.
    pub fn new(source: ScriptSource) -> Self {
        Self {
            program: DEFAULT_NODE_PROGRAM.to_string(),
            source,
            env_file: None,
        }
    }
}

impl Runtime for ScriptTarget {
    fn program(&self) -> &str {
        &self.program
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(4);
        if let Some(env_file) = &self.env_file {
            args.push("--env-file".into());
            args.push(env_file.clone().into());
        }
        match &self.source {
            ScriptSource::Inline(script) => {
                args.push("-e".into());
                args.push(script.clone().into());
            }
            ScriptSource::File(path) => args.push(path.clone().into()),
        }
        args
    }

    fn label(&self) -> &'static str {
        "node.js"
    }
}
