/// Startup configuration errors.
///
/// Every variant is fatal: the server refuses to start rather than
/// surfacing these per request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid port {0}: must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("invalid host address {value:?}: {reason}")]
    InvalidHost { value: String, reason: String },

    #[error("must provide only one of an inline script or a script file, not both")]
    ScriptSourceConflict,

    #[error("must provide exactly one of an inline script or a script file")]
    ScriptSourceMissing,

    #[error("a function name is required for the sam runtime")]
    MissingFunction,
}
