use std::io;
use std::path::PathBuf;

use serde_json::{Value, json};

use crate::route::RouteError;

/// Errors that can occur during addon management and dispatch
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Addon not found: {0}")]
    NotFound(String),

    #[error("Addon {0} is disabled")]
    Disabled(String),

    #[error("Addon {0} is enabled, disable it first")]
    Enabled(String),

    #[error("Addon already exists: {0}")]
    AlreadyInstalled(String),

    #[error("Conflicting files found for addon {name}")]
    Conflict { name: String, files: Vec<PathBuf> },

    #[error("No permission to write {}", .0.display())]
    WritePermission(PathBuf),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Descriptor error: {0}")]
    Descriptor(String),

    #[error("Addon {addon} hook failed: {message}")]
    Hook { addon: String, message: String },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Numeric code reported to administrative callers
    pub fn code(&self) -> i32 {
        match self {
            Error::Conflict { .. } => -3,
            Error::NotFound(_) => -1,
            Error::Route(e) => e.status as i32,
            _ => 0,
        }
    }

    /// Structured context attached to the error
    pub fn data(&self) -> Value {
        match self {
            Error::Conflict { files, .. } => json!({
                "conflictlist": files
                    .iter()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .collect::<Vec<_>>(),
            }),
            Error::WritePermission(path) => json!({ "path": path }),
            Error::Hook { addon, .. } => json!({ "addon": addon }),
            _ => Value::Null,
        }
    }

    /// Maps a failed write to `WritePermission` when the OS refused it
    pub(crate) fn from_write(err: io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Error::WritePermission(path.into())
        } else {
            Error::Io(err)
        }
    }
}

/// Result type alias for addon manager operations
pub type Result<T> = std::result::Result<T, Error>;
