//! Error taxonomy for the store.
//!
//! Storage and constraint failures always reach the caller. Composite-column
//! decode failures surface as [`CodecError`] from the codec functions, but the
//! DAO read paths downgrade them to an empty value plus a warning.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Store-wide result alias.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file is locked, missing, full, read-only or corrupt.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] rusqlite::Error),

    /// A uniqueness, not-null or foreign-key constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(#[source] rusqlite::Error),

    #[error("db schema version {found} is newer than app supports {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error("migration to schema version {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: Box<StoreError>,
    },

    /// A composite column could not be encoded for writing.
    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl StoreError {
    /// True for storage failures, including ones raised by a migration step.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Migration { source, .. } => source.is_unavailable(),
            _ => false,
        }
    }

    pub fn is_constraint(&self) -> bool {
        match self {
            StoreError::Constraint(_) => true,
            StoreError::Migration { source, .. } => source.is_constraint(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::Constraint(err),
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::FileLockingProtocolFailed
                | ErrorCode::OutOfMemory,
            ) => StoreError::Unavailable(err),
            _ => StoreError::Sqlite(err),
        }
    }
}

/// Failure to turn a composite column back into (or out of) its list form.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid json in column {column}: {source}")]
    Json {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid legacy entry in column {column}: {reason}")]
    Legacy { column: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn unique_violation_maps_to_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT PRIMARY KEY);")
            .unwrap();
        conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap();
        let err: StoreError = conn
            .execute("INSERT INTO t (k) VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_constraint());
    }

    #[test]
    fn unknown_table_maps_to_generic_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let err: StoreError = conn
            .execute("DELETE FROM missing", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn migration_wrapper_keeps_classification() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = StoreError::Migration {
            version: 3,
            source: Box::new(busy.into()),
        };
        assert!(err.is_unavailable());
        assert!(!err.is_constraint());

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let dup: StoreError = conn
            .execute("INSERT INTO t (k) VALUES ('a')", [])
            .unwrap_err()
            .into();
        let err = StoreError::Migration {
            version: 4,
            source: Box::new(dup),
        };
        assert!(err.is_constraint());
        assert!(!err.is_unavailable());
    }
}
