//! Error types for the SQLite store.

use thiserror::Error;

use folio_engine::EngineError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// JSON column could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A row expected to exist was missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The database file location could not be prepared.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Persistence(Box::new(err))
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn not_found_display() {
        let err = StoreError::NotFound("task p1/t9".into());
        assert_eq!(err.to_string(), "not found: task p1/t9");
    }

    #[test]
    fn migration_display() {
        let err = StoreError::Migration {
            message: "v1 failed".into(),
        };
        assert_eq!(err.to_string(), "migration error: v1 failed");
    }

    #[test]
    fn converts_into_engine_persistence_error() {
        let err: EngineError = StoreError::NotFound("x".into()).into();
        assert_matches!(err, EngineError::Persistence(_));
        assert_eq!(err.to_string(), "persistence error: not found: x");
    }
}
