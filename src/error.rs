use std::path::PathBuf;

use thiserror::Error;

/// A failed delivery attempt. Never fatal; it only drives the retry loop.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while loading or replacing the dispatch configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}
