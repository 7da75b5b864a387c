use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::error::EngineError;
use crate::records::builder::{BuiltQuery, InsertPlan};

/// Materialized query result. Column names are shared across rows in
/// statement order; the synthetic `_rowid` is always last for queries
/// built by this crate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
  pub columns: Vec<String>,
  pub rows: Vec<Vec<Value>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListResult {
  pub rows: RowSet,
  pub has_more: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertResult {
  pub inserted: usize,
  pub rows: RowSet,
}

fn query_row_set(conn: &Connection, query: &BuiltQuery) -> Result<RowSet, EngineError> {
  let mut stmt = conn
    .prepare(&query.sql)
    .map_err(|err| EngineError::execution("prepare", err))?;

  let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
  let column_count = columns.len();

  let rows = stmt
    .query_map(params_from_iter(query.params.iter().cloned()), |row| {
      let mut values = Vec::<Value>::with_capacity(column_count);
      for idx in 0..column_count {
        values.push(row.get(idx)?);
      }
      return Ok(values);
    })
    .and_then(|mapped| mapped.collect::<Result<Vec<_>, _>>())
    .map_err(|err| EngineError::execution("query", err))?;

  return Ok(RowSet { columns, rows });
}

/// Run a list query built with the has-more probe: fetch up to
/// `page_size + 1` rows, report whether the extra row existed and
/// truncate it away.
pub fn execute_list(
  conn: &Connection,
  query: &BuiltQuery,
  page_size: u64,
) -> Result<ListResult, EngineError> {
  let mut rows = query_row_set(conn, query)?;

  let has_more = rows.rows.len() as u64 > page_size;
  if has_more {
    rows.rows.truncate(page_size as usize);
  }

  return Ok(ListResult { rows, has_more });
}

/// Run an `UPDATE … RETURNING` statement. The returned rows are the
/// authoritative post-image.
pub fn execute_update(conn: &Connection, query: &BuiltQuery) -> Result<RowSet, EngineError> {
  return query_row_set(conn, query);
}

/// Run a delete-by-rowid statement; returns the number of rows affected.
pub fn execute_delete(conn: &Connection, query: &BuiltQuery) -> Result<usize, EngineError> {
  return conn
    .execute(&query.sql, params_from_iter(query.params.iter().cloned()))
    .map_err(|err| EngineError::execution("delete", err));
}

/// Run a bulk insert inside a single write transaction: one prepared
/// statement executed per row, each followed by a canonical-row readback
/// via `last_insert_rowid()`. Any row failure rolls back the whole bulk.
pub fn execute_insert(
  conn: &mut Connection,
  plan: &InsertPlan,
) -> Result<InsertResult, EngineError> {
  let table_name = &plan.table_name;
  let readback = format!(r#"SELECT *, rowid AS _rowid FROM "{table_name}" WHERE rowid = ?"#);

  let tx = conn
    .transaction()
    .map_err(|err| EngineError::execution("begin", err))?;

  let mut result = RowSet::default();
  {
    let mut insert_stmt = tx
      .prepare(&plan.sql)
      .map_err(|err| EngineError::execution("prepare insert", err))?;
    let mut readback_stmt = tx
      .prepare(&readback)
      .map_err(|err| EngineError::execution("prepare readback", err))?;

    result.columns = readback_stmt
      .column_names()
      .into_iter()
      .map(String::from)
      .collect();
    let column_count = result.columns.len();

    for params in &plan.rows_params {
      insert_stmt
        .execute(params_from_iter(params.iter().cloned()))
        .map_err(|err| EngineError::execution("insert", err))?;

      let rowid = tx.last_insert_rowid();
      let row = readback_stmt
        .query_row([rowid], |row| {
          let mut values = Vec::<Value>::with_capacity(column_count);
          for idx in 0..column_count {
            values.push(row.get(idx)?);
          }
          return Ok(values);
        })
        .map_err(|err| EngineError::execution("readback", err))?;
      result.rows.push(row);
    }
  }

  tx.commit()
    .map_err(|err| EngineError::execution("commit", err))?;

  return Ok(InsertResult {
    inserted: result.rows.len(),
    rows: result,
  });
}
