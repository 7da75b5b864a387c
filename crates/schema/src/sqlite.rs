/// Canonical schema document: the engine's semantic view of a datastore's
/// SQLite catalog, deliberately more abstract than any CREATE TABLE AST.
/// Consumers (query builder whitelists, discovery, the schema filter)
/// only ever see this projection, never parser types.
use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Storage classes of the canonical schema.
///
/// Declared SQLite types funnel into the four storage classes following
/// the affinity rules from https://sqlite.org/datatype3.html, except that
/// untyped and NUMERIC-affinity columns default to TEXT.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DbType {
  Text,
  Integer,
  Real,
  Blob,
}

impl DbType {
  pub fn from_type_name(type_name: &str) -> Self {
    let type_name = type_name.to_uppercase();

    // 1. "INT" anywhere in the declared type means INTEGER affinity. This
    //    also covers the "INT" alias for "INTEGER".
    if type_name.contains("INT") {
      return Self::Integer;
    }

    // 2. "CHAR", "CLOB" or "TEXT", e.g. VARCHAR(32), mean TEXT affinity.
    if type_name.contains("CHAR") || type_name.contains("CLOB") || type_name.contains("TEXT") {
      return Self::Text;
    }

    if type_name.contains("BLOB") {
      return Self::Blob;
    }

    if type_name.contains("REAL") || type_name.contains("FLOA") || type_name.contains("DOUB") {
      return Self::Real;
    }

    // Missing types and everything with NUMERIC affinity.
    return Self::Text;
  }

  #[inline]
  pub fn as_sql(&self) -> &'static str {
    return match self {
      Self::Text => "TEXT",
      Self::Integer => "INTEGER",
      Self::Real => "REAL",
      Self::Blob => "BLOB",
    };
  }
}

impl std::fmt::Display for DbType {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    return self.as_sql().fmt(f);
  }
}

/// Single-column foreign key as SQLite reports it. Only "ON DELETE" and
/// "ON UPDATE" exist in a foreign key clause, i.e. no "ON INSERT":
///   https://www.sqlite.org/syntax/foreign-key-clause.html
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
  pub table: String,
  pub column: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_update: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_delete: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
  pub name: String,
  /// Ordinal of the column in its CREATE TABLE, i.e. `cid` order.
  pub order: usize,
  pub db_type: DbType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dflt_value: Option<String>,
  pub notnull: bool,
  pub autoincrement: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub foreign_key: Option<ForeignKeyRef>,
}

pub type TableColumns = BTreeMap<String, ColumnMeta>;

/// `table name → column name → ColumnMeta`. Tables named `sqlite_*` never
/// appear here.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SchemaDocument {
  pub tables: BTreeMap<String, TableColumns>,
}

impl SchemaDocument {
  pub fn table(&self, name: &str) -> Option<&TableColumns> {
    return self.tables.get(name);
  }

  /// Column whitelist for the query builder, in ordinal order.
  pub fn column_names(&self, table: &str) -> Option<Vec<String>> {
    let columns = self.tables.get(table)?;

    return Some(
      columns
        .values()
        .sorted_by_key(|c| c.order)
        .map(|c| c.name.clone())
        .collect(),
    );
  }
}
