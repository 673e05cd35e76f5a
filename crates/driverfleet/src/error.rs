//! Error types for driverfleet.
//!
//! This module defines all error types used throughout the driverfleet crate.
//! Every failure that reaches the CLI boundary is one of these variants, so
//! callers can distinguish a bad query from a broken store or a missing feed.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for driverfleet operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Pipeline Errors ===
    /// The trip feed is missing or unreadable.
    #[error("trip feed not found at {path}: {message}")]
    InputNotFound {
        /// Path to the feed that couldn't be opened.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// A row of the trip feed could not be parsed.
    #[error("malformed trip feed: {0}")]
    Csv(#[from] csv::Error),

    // === Query Errors ===
    /// Query parameters were rejected before touching the store.
    #[error("invalid query: {message}")]
    Validation {
        /// Description of the rejected parameter.
        message: String,
    },

    // === Storage Errors ===
    /// A row failed to persist; the remainder of the batch was abandoned.
    #[error("store write failed after {committed} drivers were committed: {message}")]
    StoreWrite {
        /// Number of drivers fully written before the failure.
        committed: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// The store could not be read.
    #[error("store read failed: {message}")]
    StoreRead {
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for driverfleet operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new query validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new store read error.
    #[must_use]
    pub fn store_read(message: impl Into<String>) -> Self {
        Self::StoreRead {
            message: message.into(),
        }
    }

    /// Report a store failure met while serving a read as [`Error::StoreRead`].
    ///
    /// Errors that do not come from the store are returned unchanged.
    #[must_use]
    pub fn into_store_read(self) -> Self {
        match self {
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::DirectoryCreate { .. }
            | Self::Io(_)
            | Self::Json(_) => Self::store_read(self.to_string()),
            other => other,
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a rejected query parameter.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Stable machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputNotFound { .. } => "input_not_found",
            Self::Csv(_) => "malformed_input",
            Self::Validation { .. } => "validation_error",
            Self::StoreWrite { .. } => "store_write_error",
            Self::StoreRead { .. } => "store_read_error",
            Self::DatabaseOpen { .. } | Self::DatabaseQuery(_) | Self::DatabaseMigration { .. } => {
                "database_error"
            }
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => "config_error",
            Self::Io(_) | Self::DirectoryCreate { .. } => "io_error",
            Self::Json(_) => "json_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("radius must not be negative");
        assert_eq!(err.to_string(), "invalid query: radius must not be negative");
        assert!(err.is_validation_error());
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_store_write_error_reports_committed() {
        let err = Error::StoreWrite {
            committed: 7,
            message: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("disk full"));
        assert_eq!(err.kind(), "store_write_error");
        assert!(!err.is_validation_error());
    }

    #[test]
    fn test_store_read_error() {
        let err = Error::store_read("database is locked");
        assert_eq!(err.to_string(), "store read failed: database is locked");
        assert_eq!(err.kind(), "store_read_error");
    }

    #[test]
    fn test_store_failures_on_read_become_store_read() {
        let err = Error::DatabaseMigration {
            message: "database schema version 9 is newer than supported version 2".to_string(),
        }
        .into_store_read();
        assert!(matches!(err, Error::StoreRead { .. }));
        assert_eq!(err.kind(), "store_read_error");
        assert!(err.to_string().contains("newer than supported"));

        let err = Error::from(rusqlite::Error::InvalidQuery).into_store_read();
        assert_eq!(err.kind(), "store_read_error");
    }

    #[test]
    fn test_non_store_errors_keep_their_kind_on_read() {
        let err = Error::validation("radius must not be negative").into_store_read();
        assert!(err.is_validation_error());

        let err = Error::ConfigValidation {
            message: "radius_km must be greater than 0".to_string(),
        }
        .into_store_read();
        assert_eq!(err.kind(), "config_error");
    }

    #[test]
    fn test_input_not_found_display() {
        let err = Error::InputNotFound {
            path: PathBuf::from("/data/train.csv"),
            message: "No such file or directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/train.csv"));
        assert_eq!(err.kind(), "input_not_found");
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
        assert_eq!(err.kind(), "internal_error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
            assert_eq!(err.kind(), "database_error");
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "max_profiles must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("max_profiles"));
        assert_eq!(err.kind(), "config_error");
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
