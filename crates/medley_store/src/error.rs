//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the access layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite engine reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A column name was looked up that the result shape does not contain.
    ///
    /// This is a contract violation by the caller, not a data condition;
    /// lookups never return a sentinel ordinal.
    #[error("column {name:?} was not found in the result shape")]
    ColumnNotFound {
        /// The name that failed to resolve.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_not_found_display_names_the_column() {
        let err = StoreError::ColumnNotFound {
            name: "title".into(),
        };
        assert!(err.to_string().contains("title"));
    }
}
