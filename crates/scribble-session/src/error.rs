//! Session error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by an editing session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The history engine rejected a change.
    #[error(transparent)]
    History(#[from] scribble_history::Error),

    /// The config file exists but could not be read or written.
    #[error("cannot access config file {}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`SessionConfig`](crate::SessionConfig).
    #[error("invalid config file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
