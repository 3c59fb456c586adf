use std::{io, path::PathBuf};
use thiserror::Error;

/// Problems that keep the plugin from activating.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no league URL was configured to report matches or query teams")]
    MissingLeagueUrl,
    #[error("invalid debug level {0} in the configuration (expected 0-4)")]
    InvalidDebugLevel(i32),
    #[error("read map change file {path}: {source}")]
    MapChange { path: PathBuf, source: io::Error },
    #[error("rotational league is enabled but no map change file is configured")]
    MissingMapChangePath,
    #[error("the current map does not define two team colors")]
    MissingTeamColors,
    #[error("build league HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("start league HTTP worker: {0}")]
    Worker(io::Error),
}

/// A slash command that was refused. The text is what the caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl CommandError {
    pub fn denied(message: impl Into<String>) -> Self {
        CommandError::PermissionDenied(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        CommandError::InvalidState(message.into())
    }
}

/// A league response that could not be used.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response is an HTML page")]
    Markup,
    #[error("response is empty")]
    Empty,
    #[error("unexpected response: {0}")]
    Unexpected(String),
    #[error("malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),
}
