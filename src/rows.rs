//! Row cursor over a prepared rusqlite statement.

use relmap_core::error::Result;
use relmap_core::scan::RowSource;
use relmap_core::value::Value;

/// Feeds rusqlite result rows to the row scanner as owned [`Value`]s.
pub struct SqliteRows<'stmt> {
    columns: Vec<String>,
    rows: rusqlite::Rows<'stmt>,
}

impl<'stmt> SqliteRows<'stmt> {
    pub(crate) fn new(columns: Vec<String>, rows: rusqlite::Rows<'stmt>) -> Self {
        Self { columns, rows }
    }
}

impl RowSource for SqliteRows<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        let width = self.columns.len();
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let values = (0..width)
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(values))
    }
}
