use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sqlite::{DbType, ForeignKeyRef};

/// Table whose bookkeeping SQLite owns. Creating, dropping or renaming it
/// would corrupt AUTOINCREMENT state.
pub const SQLITE_SEQUENCE: &str = "sqlite_sequence";

/// Synthetic primary key every engine-created table starts out with.
pub const SYNTHETIC_PK_COLUMN: &str = "_id";

#[derive(Debug, Error)]
pub enum DdlError {
  #[error("Reserved identifier: {0}")]
  ReservedIdentifier(String),
}

/// One schema edit with a deterministic forward statement and, where the
/// statement alone carries enough information, a rollback statement.
///
/// The external representation is externally tagged with kebab-case
/// discriminators, e.g.
/// `{"add-column": {"table": "orders", "column": "user_id", "dbType": "INTEGER"}}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SchemaChange {
  AddColumn {
    table: String,
    column: String,
    db_type: DbType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    foreign_key: Option<ForeignKeyRef>,
  },
  DropColumn {
    table: String,
    column: String,
  },
  RenameColumn {
    table: String,
    column: String,
    new_name: String,
  },
  AddTable {
    table: String,
  },
  DropTable {
    table: String,
  },
  RenameTable {
    table: String,
    new_name: String,
  },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SchemaDdl {
  pub forward: String,
  /// `DROP COLUMN` and `DROP TABLE` are destructive and cannot be inverted
  /// from the statement alone.
  pub rollback: Option<String>,
}

impl SchemaChange {
  /// The table the change applies to.
  pub fn table(&self) -> &str {
    return match self {
      Self::AddColumn { table, .. }
      | Self::DropColumn { table, .. }
      | Self::RenameColumn { table, .. }
      | Self::AddTable { table }
      | Self::DropTable { table }
      | Self::RenameTable { table, .. } => table,
    };
  }

  /// Emit forward and rollback DDL.
  ///
  /// Identifiers are double-quoted verbatim; quoting is the sole injection
  /// barrier here. Charset restrictions live with the row query builder,
  /// legitimate table names may contain hyphens or spaces and schema edits
  /// are already permission-gated.
  pub fn build(&self) -> Result<SchemaDdl, DdlError> {
    self.check_reserved()?;

    return Ok(match self {
      Self::AddColumn {
        table,
        column,
        db_type,
        foreign_key,
      } => SchemaDdl {
        forward: format!(
          r#"ALTER TABLE "{table}" ADD COLUMN "{column}" {db_type}{references};"#,
          references = foreign_key.as_ref().map_or_else(String::new, references_fragment),
        ),
        rollback: Some(format!(r#"ALTER TABLE "{table}" DROP COLUMN "{column}";"#)),
      },
      Self::DropColumn { table, column } => SchemaDdl {
        forward: format!(r#"ALTER TABLE "{table}" DROP COLUMN "{column}";"#),
        rollback: None,
      },
      Self::RenameColumn {
        table,
        column,
        new_name,
      } => SchemaDdl {
        forward: format!(r#"ALTER TABLE "{table}" RENAME COLUMN "{column}" TO "{new_name}";"#),
        rollback: Some(format!(
          r#"ALTER TABLE "{table}" RENAME COLUMN "{new_name}" TO "{column}";"#
        )),
      },
      Self::AddTable { table } => SchemaDdl {
        forward: format!(
          r#"CREATE TABLE "{table}" ({SYNTHETIC_PK_COLUMN} INTEGER PRIMARY KEY AUTOINCREMENT);"#
        ),
        rollback: Some(format!(r#"DROP TABLE "{table}";"#)),
      },
      Self::DropTable { table } => SchemaDdl {
        forward: format!(r#"DROP TABLE "{table}";"#),
        rollback: None,
      },
      Self::RenameTable { table, new_name } => SchemaDdl {
        forward: format!(r#"ALTER TABLE "{table}" RENAME TO "{new_name}";"#),
        rollback: Some(format!(r#"ALTER TABLE "{new_name}" RENAME TO "{table}";"#)),
      },
    });
  }

  fn check_reserved(&self) -> Result<(), DdlError> {
    let reserved = |name: &str| -> Result<(), DdlError> {
      if name == SQLITE_SEQUENCE {
        return Err(DdlError::ReservedIdentifier(name.to_string()));
      }
      return Ok(());
    };

    return match self {
      Self::AddTable { table } | Self::DropTable { table } => reserved(table),
      Self::RenameTable { table, new_name } => {
        reserved(table)?;
        reserved(new_name)
      }
      _ => Ok(()),
    };
  }
}

fn references_fragment(fk: &ForeignKeyRef) -> String {
  let mut fragment = format!(
    r#" REFERENCES "{table}"({column})"#,
    table = fk.table,
    column = fk.column
  );

  if let Some(ref action) = fk.on_update {
    fragment.push_str(&format!(" ON UPDATE {action}"));
  }
  if let Some(ref action) = fk.on_delete {
    fragment.push_str(&format!(" ON DELETE {action}"));
  }

  return fragment;
}
