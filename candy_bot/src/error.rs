//! Error types for the candy bot.
//!
//! Cooldown and channel denials are not errors; they are ordinary outcomes
//! of the economy and command layers. What lives here is what can actually
//! go wrong: unreadable configuration, an unwritable data file, and command
//! text that does not parse.

use std::path::PathBuf;

/// Startup configuration problems. Any of these stops the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config validation: {0}")]
    Invalid(String),

    #[error("no bot token: pass --token or set REVOLT_TOKEN")]
    MissingToken,

    #[error("failed to build command pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Persistence failures for the economy document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode economy document: {0}")]
    Encode(serde_json::Error),

    #[error("failed to decode economy document: {0}")]
    Decode(serde_json::Error),
}

/// A recognised command whose arguments did not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("missing argument `{0}`")]
    MissingArgument(&'static str),

    #[error("`{0}` is not a user mention or user ID")]
    BadTarget(String),

    #[error("`{0}` is not a whole number")]
    BadAmount(String),

    #[error("unexpected extra argument `{0}`")]
    ExtraArgument(String),
}
