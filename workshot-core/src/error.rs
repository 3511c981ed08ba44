/*!
Error types for the workshot core engine.
*/

use thiserror::Error;

/// Result type used throughout the workshot core.
pub type Result<T> = std::result::Result<T, WorkshotError>;

/// Errors that can occur while capturing, storing or restoring snapshots.
#[derive(Error, Debug)]
pub enum WorkshotError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The referenced snapshot (or storage path) does not exist
    #[error("workshot '{0}' not found")]
    NotFound(String),

    /// A snapshot with this name is already stored
    #[error("workshot '{0}' already exists")]
    AlreadyExists(String),

    /// Snapshot written with a schema version this build does not accept
    #[error("schema version mismatch: got {found}, expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    /// A stored snapshot could not be read during a bulk scan
    #[error("skipping corrupted snapshot '{name}': {reason}")]
    Corrupted { name: String, reason: String },

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Plugin payload is not the shape a capturer expects
    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external command could not be run to completion
    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// Restore could not enter the saved working directory
    #[error("failed to change directory to '{}': {source}", .path.display())]
    ChangeDirectory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git checkout` refused to switch branches
    #[error("failed to checkout branch '{branch}': {output}")]
    Checkout { branch: String, output: String },

    /// Failure attributed to a single capturer
    #[error("{plugin}: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: Box<WorkshotError>,
    },

    /// Every registered capturer failed during capture
    #[error("all capture plugins failed: {}", join_errors(.0))]
    AllCapturersFailed(Vec<WorkshotError>),
}

impl WorkshotError {
    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Attribute an error to the named capturer
    pub fn plugin<S: Into<String>>(plugin: S, source: WorkshotError) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            source: Box::new(source),
        }
    }

    /// True for the distinct "snapshot does not exist" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn join_errors(errors: &[WorkshotError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
