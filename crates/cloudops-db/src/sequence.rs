//! Integer ID allocation.
//!
//! Each table draws IDs from its own counter record in `_sequence`.
//! IDs start at 1; 0 is never handed out since it marks "no parent".

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SequenceRow {
    current: i64,
}

/// Advance the counter for `table` and return the new value.
pub(crate) async fn next_id<C: Connection>(db: &Surreal<C>, table: &str) -> Result<i64, DbError> {
    let result = db
        .query("UPSERT type::record('_sequence', $table) SET current = (current ?? 0) + 1")
        .bind(("table", table.to_string()))
        .await?;
    let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

    let rows: Vec<SequenceRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(|row| row.current)
        .ok_or_else(|| DbError::Query(format!("sequence for {table} returned no value")))
}
