//! Column name resolution for query result shapes.

use crate::error::{StoreError, StoreResult};
use rusqlite::Statement;
use std::collections::HashMap;

/// An immutable mapping from lower-cased column names to 0-based ordinals.
///
/// A `ColumnsMap` is built once per distinct statement shape and is safe to
/// cache by shape. Lookup is case-insensitive: `Title`, `title` and `TITLE`
/// all resolve to the same ordinal.
///
/// # Example
///
/// ```rust
/// use medley_store::ColumnsMap;
///
/// let map = ColumnsMap::from_names(["Id", "Title"]);
/// assert_eq!(map.index("title").unwrap(), 1);
/// assert_eq!(map.index("TITLE").unwrap(), 1);
/// assert!(map.index("artist").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ColumnsMap {
    columns: HashMap<String, usize>,
}

impl ColumnsMap {
    /// Builds a map from a prepared statement's reported result shape.
    pub fn from_statement(stmt: &Statement<'_>) -> Self {
        Self::from_names(stmt.column_names())
    }

    /// Builds a map from an ordered list of column names.
    ///
    /// Ordinals are assigned in list order, starting at zero. If a name
    /// appears twice (case-insensitively), the last occurrence wins, which
    /// matches how the underlying engine resolves duplicate names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.as_ref().to_lowercase(), index))
            .collect();

        Self { columns }
    }

    /// Resolves a column name to its ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ColumnNotFound`] if the shape has no column
    /// with that name. Absence is a programming defect in the caller and is
    /// never papered over with a default ordinal.
    pub fn index(&self, name: &str) -> StoreResult<usize> {
        self.columns
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| StoreError::ColumnNotFound { name: name.into() })
    }

    /// Returns the number of columns in the shape.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the shape has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
