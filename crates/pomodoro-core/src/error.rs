//! Core error types for pomodoro-core.
//!
//! Errors are split by concern: the timer itself only ever produces
//! [`TimerError`], configuration and storage have their own enums, and
//! [`CoreError`] ties them together for hosts that want a single type.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::Phase;

/// Error type returned by phase observers and collaborators.
///
/// The timer never inspects it; it is handed back to the caller untouched.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for pomodoro-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timer state machine errors
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while driving a [`TimerState`](crate::timer::TimerState).
#[derive(Error, Debug)]
pub enum TimerError {
    /// A forced transition outside the legal table.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A phase observer failed. The state change has already been applied.
    #[error("phase observer failed")]
    Observer(#[source] ObserverError),
}

/// Raised when a caller forces a phase change the machine does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: Phase,
    pub to: Phase,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration field was zero
    #[error("Invalid value for '{field}': must be greater than zero")]
    NonPositive { field: &'static str },

    /// A restored snapshot breaks a state invariant
    #[error("Inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) if e.code == rusqlite::ErrorCode::DatabaseLocked => {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
