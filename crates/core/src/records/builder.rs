use gridbase_qs::{CompareOp, Filter, FilterValue, IsValue, Sort, Value as QsValue};
use gridbase_schema::SchemaDocument;
use itertools::Itertools;
use rusqlite::types::Value;

use crate::error::EngineError;

/// The authoritative column whitelist for one table, straight from the
/// reflected schema.
pub fn table_whitelist(schema: &SchemaDocument, table: &str) -> Result<Vec<String>, EngineError> {
  return schema
    .column_names(table)
    .ok_or_else(|| EngineError::SchemaMismatch(table.to_string()));
}

/// Page size actually used for a listing. The parser already dropped
/// non-positive values; this applies the default and the hard cap.
pub fn limit_or_default(limit: Option<u64>) -> u64 {
  const DEFAULT_PAGE_SIZE: u64 = 50;
  const HARD_LIMIT: u64 = 1024;

  return limit.unwrap_or(DEFAULT_PAGE_SIZE).min(HARD_LIMIT);
}

/// Parameterized statement: `?` placeholders plus positional parameters.
/// Builders are pure, identical inputs yield identical SQL and parameter
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltQuery {
  pub sql: String,
  pub params: Vec<Value>,
}

/// Wire spellings of the synthetic rowid projection. Both rewrite to
/// SQLite's `rowid`; everything else must come from the schema whitelist.
pub const ROWID_ALIAS: &str = "_rowid";
pub const ROWID_ALIAS_PG: &str = "_rowid_";

fn is_rowid_alias(name: &str) -> bool {
  return name == ROWID_ALIAS || name == ROWID_ALIAS_PG;
}

/// Table identifiers are restricted to a conservative charset and then
/// double-quoted, so nothing outside the pattern can reach the SQL text.
fn check_table_name(name: &str) -> Result<(), EngineError> {
  let valid = !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

  if !valid {
    return Err(EngineError::InvalidIdentifier(name.to_string()));
  }
  return Ok(());
}

/// Resolve a wire column name into its SQL form: whitelisted names are
/// double-quoted, the synthetic rowid aliases become bare `rowid`.
fn resolve_column(name: &str, valid_columns: &[String]) -> Result<String, EngineError> {
  if is_rowid_alias(name) {
    return Ok("rowid".to_string());
  }
  if valid_columns.iter().any(|c| c == name) {
    return Ok(format!(r#""{name}""#));
  }
  return Err(EngineError::UnknownColumn(name.to_string()));
}

fn to_sql_value(value: &QsValue) -> Value {
  return match value {
    QsValue::String(s) => Value::Text(s.clone()),
    QsValue::Integer(i) => Value::Integer(*i),
    QsValue::Double(d) => Value::Real(*d),
    QsValue::Bool(b) => Value::Integer(*b as i64),
    QsValue::Null => Value::Null,
  };
}

/// Filters combined with `AND`. Every column goes through the whitelist
/// before any SQL is assembled.
fn build_where_clause(
  filters: &[Filter],
  valid_columns: &[String],
) -> Result<(String, Vec<Value>), EngineError> {
  let mut fragments = Vec::<String>::with_capacity(filters.len());
  let mut params = Vec::<Value>::new();

  for filter in filters {
    let column = resolve_column(&filter.column, valid_columns)?;

    match (&filter.op, &filter.value) {
      (CompareOp::Is, FilterValue::Is(is)) => {
        // SQLite has no `IS UNKNOWN`; three-valued unknown is NULL.
        let rhs = match is {
          IsValue::Null | IsValue::Unknown => "NULL",
          IsValue::True => "TRUE",
          IsValue::False => "FALSE",
        };
        fragments.push(format!("{column} IS {rhs}"));
      }
      (CompareOp::In, FilterValue::List(values)) => {
        if values.is_empty() {
          return Err(EngineError::InvalidFilter("empty IN list"));
        }
        let placeholders = values.iter().map(|_| "?").join(", ");
        fragments.push(format!("{column} IN ({placeholders})"));
        params.extend(values.iter().map(to_sql_value));
      }
      (CompareOp::ILike, FilterValue::Scalar(value)) => {
        fragments.push(format!("{column} LIKE ? COLLATE NOCASE"));
        params.push(to_sql_value(value));
      }
      (CompareOp::Is | CompareOp::In, _) => {
        return Err(EngineError::InvalidFilter("operator/operand mismatch"));
      }
      (op, FilterValue::Scalar(value)) => {
        fragments.push(format!("{column} {} ?", op.as_sql()));
        params.push(to_sql_value(value));
      }
      _ => {
        return Err(EngineError::InvalidFilter("operator/operand mismatch"));
      }
    }
  }

  return Ok((fragments.join(" AND "), params));
}

pub struct ListQueryBuilder;

impl ListQueryBuilder {
  /// `SELECT [cols|*], rowid AS _rowid FROM "T" [WHERE …] [ORDER BY …]
  /// LIMIT ? OFFSET ?`.
  ///
  /// The LIMIT parameter is `page_size + 1`: the has-more probe. The
  /// executor truncates to `page_size` and reports whether an extra row
  /// came back.
  pub fn build(
    table_name: &str,
    filters: &[Filter],
    sort: &[Sort],
    page_size: u64,
    offset: u64,
    columns: Option<&[String]>,
    valid_columns: &[String],
  ) -> Result<BuiltQuery, EngineError> {
    check_table_name(table_name)?;

    let projection = match columns {
      Some(columns) if !columns.is_empty() => {
        let mut parts = Vec::<String>::with_capacity(columns.len() + 1);
        for column in columns {
          // The synthetic alias is always appended below.
          if !is_rowid_alias(column) {
            parts.push(resolve_column(column, valid_columns)?);
          }
        }
        parts.push("rowid AS _rowid".to_string());
        parts.join(", ")
      }
      _ => "*, rowid AS _rowid".to_string(),
    };

    let mut sql = format!(r#"SELECT {projection} FROM "{table_name}""#);
    let mut params = Vec::<Value>::new();

    if !filters.is_empty() {
      let (clause, mut where_params) = build_where_clause(filters, valid_columns)?;
      sql.push_str(&format!(" WHERE {clause}"));
      params.append(&mut where_params);
    }

    if !sort.is_empty() {
      let order_clause = sort
        .iter()
        .map(|s| -> Result<String, EngineError> {
          let column = resolve_column(&s.column, valid_columns)?;
          return Ok(format!("{column} {}", s.direction.as_sql()));
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
      sql.push_str(&format!(" ORDER BY {order_clause}"));
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    params.push(Value::Integer(page_size as i64 + 1));
    params.push(Value::Integer(offset as i64));

    return Ok(BuiltQuery { sql, params });
  }
}

pub struct UpdateQueryBuilder;

impl UpdateQueryBuilder {
  /// `UPDATE "T" SET … WHERE … RETURNING *, rowid AS _rowid`.
  ///
  /// Both the SET list and the WHERE filters must be non-empty; a
  /// filter-less UPDATE is a mass update and gets rejected outright.
  pub fn build(
    table_name: &str,
    set: &[(String, Value)],
    filters: &[Filter],
    valid_columns: &[String],
  ) -> Result<BuiltQuery, EngineError> {
    check_table_name(table_name)?;

    if set.is_empty() {
      return Err(EngineError::GuardViolation("UPDATE with empty SET"));
    }
    if filters.is_empty() {
      return Err(EngineError::GuardViolation("UPDATE without WHERE"));
    }

    let mut params = Vec::<Value>::with_capacity(set.len() + filters.len());
    let assignments = set
      .iter()
      .map(|(column, value)| -> Result<String, EngineError> {
        let column = resolve_column(column, valid_columns)?;
        params.push(value.clone());
        return Ok(format!("{column} = ?"));
      })
      .collect::<Result<Vec<_>, _>>()?
      .join(", ");

    let (clause, mut where_params) = build_where_clause(filters, valid_columns)?;
    params.append(&mut where_params);

    return Ok(BuiltQuery {
      sql: format!(
        r#"UPDATE "{table_name}" SET {assignments} WHERE {clause} RETURNING *, rowid AS _rowid"#
      ),
      params,
    });
  }
}

pub struct DeleteQueryBuilder;

impl DeleteQueryBuilder {
  /// `DELETE FROM "T" WHERE rowid IN (?, …)`. Deletion is by explicit
  /// rowids only; an empty list is a guard violation, not a no-op.
  pub fn build(table_name: &str, rowids: &[i64]) -> Result<BuiltQuery, EngineError> {
    check_table_name(table_name)?;

    if rowids.is_empty() {
      return Err(EngineError::GuardViolation("DELETE without rowids"));
    }

    let placeholders = rowids.iter().map(|_| "?").join(", ");
    return Ok(BuiltQuery {
      sql: format!(r#"DELETE FROM "{table_name}" WHERE rowid IN ({placeholders})"#),
      params: rowids.iter().map(|id| Value::Integer(*id)).collect(),
    });
  }
}

/// One prepared INSERT plus per-row parameter vectors, executed inside a
/// single transaction by the executor.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertPlan {
  pub table_name: String,
  pub sql: String,
  pub rows_params: Vec<Vec<Value>>,
}

pub struct InsertQueryBuilder;

impl InsertQueryBuilder {
  /// All rows must share the key set of the first row; the column order
  /// of the statement is the first row's.
  pub fn build(
    table_name: &str,
    rows: &[Vec<(String, Value)>],
    valid_columns: &[String],
  ) -> Result<InsertPlan, EngineError> {
    check_table_name(table_name)?;

    let Some(first) = rows.first() else {
      return Err(EngineError::GuardViolation("INSERT without rows"));
    };

    let column_names: Vec<&str> = first.iter().map(|(name, _)| name.as_str()).collect();
    let quoted = column_names
      .iter()
      .map(|name| resolve_column(name, valid_columns))
      .collect::<Result<Vec<_>, _>>()?
      .join(", ");
    let placeholders = column_names.iter().map(|_| "?").join(", ");

    let rows_params = rows
      .iter()
      .map(|row| -> Result<Vec<Value>, EngineError> {
        if row.len() != column_names.len() {
          return Err(EngineError::InvalidFilter("row key set mismatch"));
        }

        return column_names
          .iter()
          .map(|name| {
            return row
              .iter()
              .find(|(n, _)| n == name)
              .map(|(_, value)| value.clone())
              .ok_or(EngineError::InvalidFilter("row key set mismatch"));
          })
          .collect();
      })
      .collect::<Result<Vec<_>, _>>()?;

    return Ok(InsertPlan {
      table_name: table_name.to_string(),
      sql: format!(r#"INSERT INTO "{table_name}" ({quoted}) VALUES ({placeholders})"#),
      rows_params,
    });
  }
}
