//! Forward-only row cursors over query results.

use crate::columns::ColumnsMap;
use crate::error::StoreResult;
use rusqlite::{Params, Row, Rows, Statement};

/// A forward-only view over a query result, paired with its [`ColumnsMap`].
///
/// The cursor owns the underlying result stream for the lifetime of the
/// borrowed statement. Rows are produced lazily, in the order the engine
/// emits them, and the stream is not restartable. Dropping the cursor (or
/// calling [`RowCursor::close`]) releases the stream.
///
/// Column ordinals should be resolved once, before iteration, and reused for
/// every row:
///
/// ```rust
/// use medley_store::RowCursor;
///
/// let conn = rusqlite::Connection::open_in_memory()?;
/// conn.execute_batch("CREATE TABLE t (id INTEGER, title TEXT);
///                     INSERT INTO t VALUES (1, 'a'), (2, 'b');")?;
///
/// let mut stmt = conn.prepare("SELECT id, title FROM t ORDER BY id")?;
/// let mut cursor = RowCursor::over(&mut stmt)?;
///
/// let title = cursor.column_index("title")?;
/// while let Some(row) = cursor.next()? {
///     let _: String = row.get(title)?;
/// }
/// # Ok::<(), medley_store::StoreError>(())
/// ```
pub struct RowCursor<'stmt> {
    rows: Rows<'stmt>,
    columns: ColumnsMap,
}

impl<'stmt> RowCursor<'stmt> {
    /// Executes a parameterless statement and wraps its result stream.
    pub fn over(stmt: &'stmt mut Statement<'_>) -> StoreResult<Self> {
        Self::query(stmt, [])
    }

    /// Executes a statement with parameters and wraps its result stream.
    ///
    /// The column map is captured from the statement's declared shape before
    /// execution, so it is valid even for an empty result.
    pub fn query<P: Params>(stmt: &'stmt mut Statement<'_>, params: P) -> StoreResult<Self> {
        let columns = ColumnsMap::from_statement(stmt);
        let rows = stmt.query(params)?;
        Ok(Self { rows, columns })
    }

    /// Advances to the next row, or returns `None` at end of stream.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> StoreResult<Option<&Row<'stmt>>> {
        Ok(self.rows.next()?)
    }

    /// Resolves a column name through the cursor's [`ColumnsMap`].
    ///
    /// Fails exactly as [`ColumnsMap::index`] does for absent names.
    pub fn column_index(&self, name: &str) -> StoreResult<usize> {
        self.columns.index(name)
    }

    /// Returns the cursor's column map.
    pub fn columns(&self) -> &ColumnsMap {
        &self.columns
    }

    /// Closes the cursor, releasing the underlying result stream.
    ///
    /// Dropping the cursor has the same effect; the explicit form exists for
    /// callers that want the release to be visible at the call site. Use
    /// after close is unrepresentable because `close` consumes the cursor.
    pub fn close(self) {}
}
