//! Error handling for the entrypoint
//!
//! Every failure that can stop the container before the workload starts is
//! one of these variants. Each maps to the exit status the process ends with.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the entrypoint
#[derive(Error, Debug)]
pub enum EntrypointError {
    /// Invoked without any command to run
    #[error("no command given")]
    NoCommand,

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The target account does not exist in the user database
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    /// Ownership change failed somewhere in the data directory
    #[error("cannot change ownership of {}: {source}", path.display())]
    Ownership {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Native privilege drop (groups, gid, uid) failed
    #[error("cannot drop privileges to '{user}': {reason}")]
    PrivilegeDrop { user: String, reason: String },

    /// Process replacement failed
    #[error("cannot execute '{program}': {source}")]
    Exec {
        program: String,
        #[source]
        source: io::Error,
    },

    /// IO errors not tied to a specific stage
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for entrypoint operations
pub type Result<T> = std::result::Result<T, EntrypointError>;

impl EntrypointError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a privilege drop error
    pub fn privilege_drop(user: impl Into<String>, reason: impl ToString) -> Self {
        Self::PrivilegeDrop {
            user: user.into(),
            reason: reason.to_string(),
        }
    }

    /// Exit status for this failure, following shell conventions for exec
    /// errors (127 not found, 126 not executable).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exec { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => 127,
                io::ErrorKind::PermissionDenied => 126,
                _ => 1,
            },
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for EntrypointError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{:#}", err))
    }
}
