//! Error types for the maintenance sequencer
//!
//! Stages record their failures into the report instead of returning them.
//! Only the conditions below ever leave a stage or abort a run.

use std::fmt;
use std::time::Duration;

/// Main error type for a maintenance run
#[derive(Debug)]
pub enum MaintenanceError {
    /// Another maintenance run holds a valid lock
    LockHeld { pid: u32, since: String },

    /// Lock file could not be inspected, created or written
    Lock(LockError),

    /// Report could not be persisted
    Report(ReportError),
}

/// Lock file error variants
#[derive(Debug)]
pub enum LockError {
    /// I/O failure on the lock file
    Io { path: String, reason: String },

    /// Lock record could not be serialized
    Encode { reason: String },
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    LoadFailed { path: String, reason: String },

    /// Configuration parsing error
    ParseError { path: String, reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },
}

/// Database maintenance error variants
#[derive(Debug)]
pub enum DatabaseError {
    /// A maintenance statement exceeded its budget
    Timeout { operation: String, limit: Duration },

    /// The store became unreachable mid-sequence
    Unavailable { operation: String, reason: String },
}

/// Report persistence error variants
#[derive(Debug)]
pub enum ReportError {
    /// Report directory or file could not be written
    WriteFailed { path: String, reason: String },

    /// Report could not be serialized
    SerializationError { reason: String },
}

impl fmt::Display for MaintenanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceError::LockHeld { pid, since } => {
                write!(f, "Maintenance already running (pid {}, since {})", pid, since)
            }
            MaintenanceError::Lock(e) => write!(f, "Lock error: {}", e),
            MaintenanceError::Report(e) => write!(f, "Report error: {}", e),
        }
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Io { path, reason } => write!(f, "{}: {}", path, reason),
            LockError::Encode { reason } => write!(f, "Failed to encode lock record: {}", reason),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::ParseError { path, reason } => {
                write!(f, "Failed to parse '{}': {}", path, reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::Timeout { operation, limit } => {
                write!(f, "{} timed out after {}s", operation, limit.as_secs())
            }
            DatabaseError::Unavailable { operation, reason } => {
                write!(f, "Store unavailable during {}: {}", operation, reason)
            }
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::WriteFailed { path, reason } => {
                write!(f, "Failed to write '{}': {}", path, reason)
            }
            ReportError::SerializationError { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
        }
    }
}

impl std::error::Error for MaintenanceError {}
impl std::error::Error for LockError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for DatabaseError {}
impl std::error::Error for ReportError {}

impl From<LockError> for MaintenanceError {
    fn from(err: LockError) -> Self {
        MaintenanceError::Lock(err)
    }
}

impl From<ReportError> for MaintenanceError {
    fn from(err: ReportError) -> Self {
        MaintenanceError::Report(err)
    }
}
