use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;
use thiserror::Error;

use crate::sqlite::{ColumnMeta, DbType, ForeignKeyRef, SchemaDocument, TableColumns};

#[derive(Debug, Error)]
pub enum ReflectError {
  #[error("SQLite error: {0}")]
  Sqlite(#[from] rusqlite::Error),
}

lazy_static! {
  /// A column definition line carrying AUTOINCREMENT. SQLite does not
  /// expose the flag through any PRAGMA, the original CREATE TABLE text
  /// is the only source.
  static ref AUTOINCREMENT_LINE: Regex =
    Regex::new(r"(?i)^\s*(\w+)\s+\w+\s+PRIMARY\s+KEY\s+AUTOINCREMENT").expect("valid regex");
}

/// Project the live catalog of `conn` into the canonical schema document.
///
/// `sqlite_*` tables are excluded. Missing column types default to TEXT.
pub fn reflect_schema(conn: &Connection) -> Result<SchemaDocument, ReflectError> {
  let entries: Vec<(String, String)> = {
    let mut stmt = conn.prepare(
      "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
      return Ok((
        row.get::<_, String>(0)?,
        row.get::<_, Option<String>>(1)?.unwrap_or_default(),
      ));
    })?;
    rows.collect::<Result<_, _>>()?
  };

  let mut tables = BTreeMap::<String, TableColumns>::new();
  for (table_name, create_sql) in entries {
    let columns = reflect_table(conn, &table_name, &create_sql)?;
    tables.insert(table_name, columns);
  }

  return Ok(SchemaDocument { tables });
}

fn reflect_table(
  conn: &Connection,
  table_name: &str,
  create_sql: &str,
) -> Result<TableColumns, ReflectError> {
  let escaped = table_name.replace('"', "\"\"");
  let foreign_keys = reflect_foreign_keys(conn, &escaped)?;
  let autoincrement = autoincrement_columns(create_sql);

  let mut stmt = conn.prepare(&format!(r#"PRAGMA table_info("{escaped}")"#))?;
  let columns = stmt
    .query_map([], |row| {
      let cid: i64 = row.get("cid")?;
      let name: String = row.get("name")?;
      let type_name: String = row.get("type")?;
      let notnull: bool = row.get("notnull")?;
      let dflt_value: Option<String> = row.get("dflt_value")?;

      return Ok(ColumnMeta {
        autoincrement: autoincrement.contains(&name.to_lowercase()),
        foreign_key: foreign_keys.get(&name).cloned(),
        order: cid as usize,
        db_type: DbType::from_type_name(&type_name),
        dflt_value,
        notnull,
        name,
      });
    })?
    .collect::<Result<Vec<_>, _>>()?;

  return Ok(
    columns
      .into_iter()
      .map(|c| (c.name.clone(), c))
      .collect::<TableColumns>(),
  );
}

fn reflect_foreign_keys(
  conn: &Connection,
  escaped_table_name: &str,
) -> Result<HashMap<String, ForeignKeyRef>, ReflectError> {
  let mut stmt = conn.prepare(&format!(
    r#"PRAGMA foreign_key_list("{escaped_table_name}")"#
  ))?;
  let rows = stmt.query_map([], |row| {
    let from: String = row.get("from")?;
    return Ok((
      from,
      ForeignKeyRef {
        table: row.get("table")?,
        // A bare `REFERENCES t` leaves `to` NULL; resolve to the implied
        // primary key name downstream if ever needed.
        column: row.get::<_, Option<String>>("to")?.unwrap_or_default(),
        on_update: row.get("on_update")?,
        on_delete: row.get("on_delete")?,
      },
    ));
  })?;

  return Ok(rows.collect::<Result<HashMap<_, _>, _>>()?);
}

/// Lower-cased names of columns whose defining CREATE TABLE line declares
/// AUTOINCREMENT.
fn autoincrement_columns(create_sql: &str) -> HashSet<String> {
  return create_sql
    .lines()
    .filter_map(|line| AUTOINCREMENT_LINE.captures(line))
    .map(|captures| captures[1].to_lowercase())
    .collect();
}
