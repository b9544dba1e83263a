//! Error types for the dice engine.

use std::path::PathBuf;

/// Errors produced while parsing a dice expression.
///
/// Always recoverable: no state is touched before parsing succeeds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The text does not match `<count>d<faces>(<+|-><int>)*`.
    #[error("invalid dice expression: \"{0}\"")]
    BadFormat(String),

    /// The die has too few or too many faces.
    #[error("faces must be between 1 and {max}, got {faces}")]
    FacesOutOfRange {
        /// The number of faces requested.
        faces: u32,
        /// The largest number of faces allowed.
        max: u32,
    },

    /// Too few or too many dice were requested.
    #[error("dice count must be between 1 and {max}, got {count}")]
    CountOutOfRange {
        /// The number of dice requested.
        count: u32,
        /// The largest number of dice allowed.
        max: u32,
    },

    /// More modifiers than the command allows.
    #[error("at most {max} modifiers are allowed, got {count}")]
    TooManyModifiers {
        /// The number of modifiers found.
        count: usize,
        /// The largest number of modifiers allowed.
        max: usize,
    },
}

/// Errors raised by a state backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the durable location failed.
    #[error("state file {path}: {source}")]
    Io {
        /// The file that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The state map could not be encoded.
    #[error("cannot encode user state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The stored text is not a valid state map.
    #[error("cannot decode user state: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// Errors returned by [`Engine::resolve`](crate::Engine::resolve).
#[derive(Debug, thiserror::Error)]
pub enum RollError {
    /// The expression was rejected by the parser.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A hidden roll on behalf of another user needs a privileged caller.
    #[error("rolling on behalf of {target} requires a privileged caller")]
    NotPrivileged {
        /// The user the roll was meant for.
        target: String,
    },
}

/// Errors raised while loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this engine.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting is outside the range the engine supports.
    #[error("invalid config: {field} {reason}")]
    Invalid {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

/// Convenience result type for roll resolution.
pub type MechResult<T> = Result<T, RollError>;
