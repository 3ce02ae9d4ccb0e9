//! # Constituency - constituency data backend
//!
//! Administrative backend for local constituency data, exposed as a REST API
//! over SQLite.
//!
//! Constituency provides:
//! - Voter rolls with household (family) linkage kept transactionally consistent
//! - Booth-level election analytics: party summary, winners, penetration
//! - Master data, events, visitor log, party leadership roster, message log
//! - Bulk CSV import of election results and leadership rosters
//! - A bounded SQLite connection pool shared by the HTTP handlers

pub mod config;
pub mod election;
pub mod family;
pub mod import;
pub mod records;
pub mod server;
pub mod storage;
pub mod ui;
pub mod uploads;
pub mod voter;

// Re-exports for convenient access
pub use election::{BoothResult, Party};
pub use family::{FamilyLinker, NewFamily, SelectedVoter};
pub use storage::{SqliteStore, StorePool};

/// Result type alias for Constituency operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Constituency operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is missing or malformed
    #[error("{0}")]
    Validation(String),

    /// The write would duplicate an existing record
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out waiting for a database connection")]
    PoolTimeout,

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Upload error: {0}")]
    Upload(String),
}

impl Error {
    /// HTTP status this error surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::Conflict(_) | Error::Upload(_) => 400,
            Error::NotFound(_) => 404,
            Error::Unauthorized(_) => 401,
            Error::PoolTimeout | Error::PoolClosed => 503,
            Error::Storage(_) | Error::Io(_) | Error::Csv(_) | Error::Json(_) => 500,
        }
    }

    /// True when a store write was rejected by a UNIQUE constraint
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Error::Storage(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Validation("x".into()).status_code(), 400);
        assert_eq!(Error::Conflict("x".into()).status_code(), 400);
        assert_eq!(Error::NotFound("x".into()).status_code(), 404);
        assert_eq!(Error::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(
            Error::Storage(rusqlite::Error::QueryReturnedNoRows).status_code(),
            500
        );
    }

    #[test]
    fn test_display_passes_message_through() {
        let err = Error::NotFound("Member not found".into());
        assert_eq!(err.to_string(), "Member not found");
    }
}
