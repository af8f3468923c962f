use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use bridge_core::duration::parse_duration;
use bridge_core::error::ConfigError;
use bridge_core::invocation::target::{DEFAULT_NODE_PROGRAM, DEFAULT_SAM_PROGRAM};
use bridge_core::invocation::{InvocationConfig, InvocationTarget, SamTarget, ScriptSource, ScriptTarget};
use clap::{Parser, ValueEnum};

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default cap on request body size (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Which interpreter serves `/invoke`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeKind {
    /// `sam local invoke <function> --template <path> --event -`
    Sam,
    /// `node (-e <script> | <script-file>)`
    Node,
}

/// Command-line flags. Each flag falls back to its environment variable,
/// then to the default.
#[derive(Debug, Parser)]
#[command(
    name = "bridge-api",
    version,
    about = "Forward JSON payloads to a local SAM or Node.js invocation"
)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Timeout for a single invocation (e.g. 30s, 1m)
    #[arg(long, env = "TIMEOUT_DURATION", default_value = "30s")]
    pub timeout: String,

    /// Timeout for reading a request body
    #[arg(long, env = "READ_TIMEOUT", default_value = "10s")]
    pub read_timeout: String,

    /// Upper bound on producing a response, from request start
    #[arg(long, env = "WRITE_TIMEOUT", default_value = "60s")]
    pub write_timeout: String,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Interpreter to invoke
    #[arg(long, env = "RUNTIME", value_enum, default_value_t = RuntimeKind::Node)]
    pub runtime: RuntimeKind,

    /// Interpreter executable (defaults to `sam` or `node`)
    #[arg(long, env = "RUNTIME_PROGRAM")]
    pub program: Option<String>,

    /// SAM function logical ID
    #[arg(long, env = "FUNCTION_NAME")]
    pub function: Option<String>,

    /// SAM template path
    #[arg(long, env = "TEMPLATE_PATH", default_value = "template.yaml")]
    pub template: String,

    /// JSON file with environment overrides for SAM (optional)
    #[arg(long, env = "ENV_VARS_FILE")]
    pub env_vars: Option<String>,

    /// Inline JavaScript to evaluate (mutually exclusive with --script-file)
    #[arg(long, env = "SCRIPT")]
    pub script: Option<String>,

    /// Path to JavaScript file to run (mutually exclusive with --script)
    #[arg(long, env = "SCRIPT_FILE")]
    pub script_file: Option<String>,

    /// Path to .env file for the script (optional)
    #[arg(long, env = "ENV_FILE")]
    pub env_file: Option<String>,
}

/// Server configuration, resolved once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: IpAddr,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Upper bound on reading a request body (default: `10s`).
    pub read_timeout: Duration,
    /// Upper bound on handling a request end to end (default: `60s`).
    pub write_timeout: Duration,
    /// Largest accepted request body (default: 10 MiB).
    pub max_body_bytes: usize,
    /// What `/invoke` runs, and for how long at most.
    pub invocation: InvocationConfig,
}

impl ServerConfig {
    /// Resolve configuration from flags, environment and defaults.
    ///
    /// | Flag               | Env Var            | Default         |
    /// |--------------------|--------------------|-----------------|
    /// | `--host`           | `HOST`             | `0.0.0.0`       |
    /// | `--port`           | `PORT`             | `8080`          |
    /// | `--timeout`        | `TIMEOUT_DURATION` | `30s`           |
    /// | `--read-timeout`   | `READ_TIMEOUT`     | `10s`           |
    /// | `--write-timeout`  | `WRITE_TIMEOUT`    | `60s`           |
    /// | `--max-body-bytes` | `MAX_BODY_BYTES`   | `10485760`      |
    /// | `--runtime`        | `RUNTIME`          | `node`          |
    /// | `--program`        | `RUNTIME_PROGRAM`  | `sam` / `node`  |
    /// | `--function`       | `FUNCTION_NAME`    | --              |
    /// | `--template`       | `TEMPLATE_PATH`    | `template.yaml` |
    /// | `--env-vars`       | `ENV_VARS_FILE`    | --              |
    /// | `--script`         | `SCRIPT`           | --              |
    /// | `--script-file`    | `SCRIPT_FILE`      | --              |
    /// | `--env-file`       | `ENV_FILE`         | --              |
    ///
    /// Exits the process with usage help when flags cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(Cli::parse())
    }

    /// Validate parsed flags into a configuration.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let host = cli
            .host
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidHost {
                value: cli.host.clone(),
                reason: e.to_string(),
            })?;

        if cli.port == 0 {
            return Err(ConfigError::InvalidPort(cli.port));
        }

        let timeout = parse_duration(&cli.timeout)?;
        let read_timeout = parse_duration(&cli.read_timeout)?;
        let write_timeout = parse_duration(&cli.write_timeout)?;
        let program = non_empty(cli.program);

        let target = match cli.runtime {
            RuntimeKind::Sam => {
                let function = non_empty(cli.function).ok_or(ConfigError::MissingFunction)?;
                InvocationTarget::Sam(SamTarget {
                    program: program.unwrap_or_else(|| DEFAULT_SAM_PROGRAM.to_string()),
                    function,
                    template: PathBuf::from(cli.template),
                    env_vars: non_empty(cli.env_vars).map(PathBuf::from),
                })
            }
            RuntimeKind::Node => InvocationTarget::Script(ScriptTarget {
                program: program.unwrap_or_else(|| DEFAULT_NODE_PROGRAM.to_string()),
                source: ScriptSource::from_options(cli.script, non_empty(cli.script_file).map(PathBuf::from))?,
                env_file: non_empty(cli.env_file).map(PathBuf::from),
            }),
        };

        Ok(Self {
            host,
            port: cli.port,
            read_timeout,
            write_timeout,
            max_body_bytes: cli.max_body_bytes,
            invocation: InvocationConfig { timeout, target },
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bridge_core::invocation::Runtime;

    use super::*;

    /// Every env-backed flag with its default value. Passing all of them
    /// keeps the ambient environment (`PORT`, `RUNTIME`, ...) out of the
    /// result.
    const BASELINE: &[(&str, &str)] = &[
        ("--host", "0.0.0.0"),
        ("--port", "8080"),
        ("--timeout", "30s"),
        ("--read-timeout", "10s"),
        ("--write-timeout", "60s"),
        ("--max-body-bytes", "10485760"),
        ("--runtime", "node"),
        ("--program", ""),
        ("--function", ""),
        ("--template", "template.yaml"),
        ("--env-vars", ""),
        ("--script", ""),
        ("--script-file", ""),
        ("--env-file", ""),
    ];

    fn parse(overrides: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        for (flag, _) in overrides {
            assert!(
                BASELINE.iter().any(|(known, _)| known == flag),
                "{flag} missing from BASELINE"
            );
        }

        let mut args = vec!["bridge-api".to_string()];
        for (flag, default) in BASELINE {
            let value = overrides
                .iter()
                .find(|(name, _)| name == flag)
                .map_or(*default, |(_, value)| *value);
            args.push(flag.to_string());
            args.push(value.to_string());
        }

        let cli = Cli::try_parse_from(args).expect("flags parse");
        ServerConfig::from_cli(cli)
    }

    #[test]
    fn defaults_apply_when_flags_carry_defaults() {
        let config = parse(&[("--script", "1")]).expect("valid config");

        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(60));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.invocation.timeout, Duration::from_secs(30));
        assert_eq!(config.invocation.target.program(), DEFAULT_NODE_PROGRAM);
    }

    #[test]
    fn node_with_inline_script() {
        let config = parse(&[("--port", "9000"), ("--timeout", "5s"), ("--script", "1+1")])
            .expect("valid config");

        assert_eq!(config.port, 9000);
        assert_eq!(config.invocation.timeout, Duration::from_secs(5));
        assert_matches!(
            &config.invocation.target,
            InvocationTarget::Script(ScriptTarget { source: ScriptSource::Inline(s), .. }) if s == "1+1"
        );
    }

    #[test]
    fn node_with_script_file_and_env_file() {
        let config = parse(&[
            ("--script-file", "handler.js"),
            ("--env-file", ".env"),
            ("--program", "/usr/local/bin/node"),
        ])
        .expect("valid config");

        let target = &config.invocation.target;
        assert_eq!(target.program(), "/usr/local/bin/node");
        assert_eq!(
            target.args(),
            vec!["--env-file", ".env", "handler.js"]
                .into_iter()
                .map(std::ffi::OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn both_script_sources_rejected() {
        assert_matches!(
            parse(&[("--script", "1+1"), ("--script-file", "a.js")]),
            Err(ConfigError::ScriptSourceConflict)
        );
    }

    #[test]
    fn missing_script_source_rejected() {
        assert_matches!(parse(&[]), Err(ConfigError::ScriptSourceMissing));
    }

    #[test]
    fn sam_requires_function() {
        assert_matches!(
            parse(&[("--runtime", "sam")]),
            Err(ConfigError::MissingFunction)
        );
    }

    #[test]
    fn sam_target_built_from_flags() {
        let config = parse(&[
            ("--runtime", "sam"),
            ("--function", "HelloWorld"),
            ("--template", "infra/template.yaml"),
            ("--env-vars", "env.json"),
        ])
        .expect("valid config");

        assert_matches!(
            &config.invocation.target,
            InvocationTarget::Sam(sam)
                if sam.function == "HelloWorld"
                    && sam.program == DEFAULT_SAM_PROGRAM
                    && sam.env_vars.as_deref() == Some(std::path::Path::new("env.json"))
        );
    }

    #[test]
    fn zero_port_rejected() {
        assert_matches!(
            parse(&[("--port", "0"), ("--script", "1")]),
            Err(ConfigError::InvalidPort(0))
        );
    }

    #[test]
    fn bad_durations_rejected() {
        for flag in ["--timeout", "--read-timeout", "--write-timeout"] {
            assert_matches!(
                parse(&[(flag, "30"), ("--script", "1")]),
                Err(ConfigError::InvalidDuration { .. }),
                "{flag}"
            );
        }
        assert_matches!(
            parse(&[("--read-timeout", "soon"), ("--script", "1")]),
            Err(ConfigError::InvalidDuration { .. })
        );
    }

    #[test]
    fn write_timeout_is_configurable() {
        let config = parse(&[("--write-timeout", "2m"), ("--script", "1")]).expect("valid config");
        assert_eq!(config.write_timeout, Duration::from_secs(120));
    }

    #[test]
    fn bad_host_rejected() {
        assert_matches!(
            parse(&[("--host", "not-an-ip"), ("--script", "1")]),
            Err(ConfigError::InvalidHost { .. })
        );
    }
}
