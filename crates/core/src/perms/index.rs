use std::collections::{HashMap, HashSet};

use log::*;

use crate::perms::action::{Action, ColumnAction, DatastoreAction, GlobalAction, TableAction};
use crate::perms::target::{Segment, Target, parse_target};

/// Indexed, deduplicated union of one caller's `(target, action)` rows.
///
/// Permissions form a join-semilattice: the index is the least upper
/// bound of its rows, so building is order-independent and idempotent and
/// "most permissive wins" by construction. The index is immutable once
/// built; construct per request (or cache per API key) and discard.
///
/// Indexed buckets, by (target shape, action scope):
///
/// | target                              | scope     | bucket                           |
/// |-------------------------------------|-----------|----------------------------------|
/// | `*`                                 | global    | `global`                         |
/// | `datastore:*`                       | datastore | `all_datastores`                 |
/// | `datastore:D`                       | datastore | `datastores[D].actions`          |
/// | `datastore:*.table:*`               | table     | `all_tables`                     |
/// | `datastore:D.table:*`               | table     | `datastores[D].all_tables`       |
/// | `datastore:D.table:T`               | table     | `…tables[T].actions`             |
/// | `datastore:*.table:*.column:*`      | column    | `all_columns`                    |
/// | `datastore:D.table:T.column:*`      | column    | `…tables[T].all_columns`         |
/// | `datastore:D.table:T.column:C`      | column    | `…columns[C]`                    |
///
/// Everything else is dropped: scope/level mismatches, and wildcard
/// shapes outside the table, notably `datastore:D.table:*.column:*`.
/// The latter is rare, complicates lookups and is expressible as
/// per-table `column:*` or the global all-columns wildcard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PermissionIndex {
  global: HashSet<GlobalAction>,
  all_datastores: HashSet<DatastoreAction>,
  all_tables: HashSet<TableAction>,
  all_columns: HashSet<ColumnAction>,
  datastores: HashMap<String, DatastoreGrants>,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct DatastoreGrants {
  actions: HashSet<DatastoreAction>,
  all_tables: HashSet<TableAction>,
  tables: HashMap<String, TableGrants>,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct TableGrants {
  actions: HashSet<TableAction>,
  all_columns: HashSet<ColumnAction>,
  columns: HashMap<String, HashSet<ColumnAction>>,
}

impl PermissionIndex {
  pub fn from_rows<T: AsRef<str>, A: AsRef<str>>(
    rows: impl IntoIterator<Item = (T, A)>,
  ) -> PermissionIndex {
    let mut index = PermissionIndex::default();
    for (target, action) in rows {
      index.insert_row(target.as_ref(), action.as_ref());
    }
    return index;
  }

  fn insert_row(&mut self, target: &str, action: &str) {
    let Some(target) = parse_target(target) else {
      debug!("skipping malformed permission target: {target}");
      return;
    };
    let Some(action) = Action::from(action) else {
      debug!("skipping unknown permission action: {action}");
      return;
    };

    use Segment::{Any, Named};
    match (target, action) {
      (Target::Global, Action::Global(a)) => {
        self.global.insert(a);
      }
      (Target::Datastore(Any), Action::Datastore(a)) => {
        self.all_datastores.insert(a);
      }
      (Target::Datastore(Named(d)), Action::Datastore(a)) => {
        self.datastores.entry(d).or_default().actions.insert(a);
      }
      (Target::Table(Any, Any), Action::Table(a)) => {
        self.all_tables.insert(a);
      }
      (Target::Table(Named(d), Any), Action::Table(a)) => {
        self.datastores.entry(d).or_default().all_tables.insert(a);
      }
      (Target::Table(Named(d), Named(t)), Action::Table(a)) => {
        self
          .datastores
          .entry(d)
          .or_default()
          .tables
          .entry(t)
          .or_default()
          .actions
          .insert(a);
      }
      (Target::Column(Any, Any, Any), Action::Column(a)) => {
        self.all_columns.insert(a);
      }
      (Target::Column(Named(d), Named(t), Any), Action::Column(a)) => {
        self
          .datastores
          .entry(d)
          .or_default()
          .tables
          .entry(t)
          .or_default()
          .all_columns
          .insert(a);
      }
      (Target::Column(Named(d), Named(t), Named(c)), Action::Column(a)) => {
        self
          .datastores
          .entry(d)
          .or_default()
          .tables
          .entry(t)
          .or_default()
          .columns
          .entry(c)
          .or_default()
          .insert(a);
      }
      (target, action) => {
        debug!("dropping unindexable permission: {target:?} {action:?}");
      }
    }
  }

  pub fn has_global(&self, action: GlobalAction) -> bool {
    return self.global.contains(&action);
  }

  pub fn has_datastore(&self, datastore_id: &str, action: DatastoreAction) -> bool {
    if self.all_datastores.contains(&action) {
      return true;
    }
    return self
      .datastores
      .get(datastore_id)
      .is_some_and(|d| d.actions.contains(&action));
  }

  pub fn has_table(&self, datastore_id: &str, table: &str, action: TableAction) -> bool {
    if self.all_tables.contains(&action) {
      return true;
    }
    let Some(datastore) = self.datastores.get(datastore_id) else {
      return false;
    };
    if datastore.all_tables.contains(&action) {
      return true;
    }
    return datastore
      .tables
      .get(table)
      .is_some_and(|t| t.actions.contains(&action));
  }

  pub fn has_column(
    &self,
    datastore_id: &str,
    table: &str,
    column: &str,
    action: ColumnAction,
  ) -> bool {
    if self.has_all_columns(datastore_id, table, action) {
      return true;
    }
    return self
      .table_grants(datastore_id, table)
      .and_then(|t| t.columns.get(column))
      .is_some_and(|c| c.contains(&action));
  }

  /// Whether `action` is granted on *every* column of `table`, present
  /// and future. This is the gate for star projections and implicit
  /// insert column lists, where per-column grants can't be enumerated.
  pub fn has_all_columns(&self, datastore_id: &str, table: &str, action: ColumnAction) -> bool {
    if self.all_columns.contains(&action) {
      return true;
    }
    return self
      .table_grants(datastore_id, table)
      .is_some_and(|t| t.all_columns.contains(&action));
  }

  fn table_grants(&self, datastore_id: &str, table: &str) -> Option<&TableGrants> {
    return self.datastores.get(datastore_id)?.tables.get(table);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn index(rows: &[(&str, &str)]) -> PermissionIndex {
    return PermissionIndex::from_rows(rows.iter().copied());
  }

  const ROWS: &[(&str, &str)] = &[
    ("*", "datastore.create"),
    ("datastore:*", "datastore.list"),
    ("datastore:D", "datastore.table.create"),
    ("datastore:*.table:*", "datastore.table.list"),
    ("datastore:D.table:*", "datastore.table.row.select"),
    ("datastore:D.table:users", "datastore.table.row.update"),
    ("datastore:D.table:users.column:name", "datastore.table.column.update"),
    ("datastore:D.table:users.column:*", "datastore.table.column.select"),
    ("datastore:*.table:*.column:*", "datastore.table.column.insert"),
  ];

  #[test]
  fn test_order_independence_and_idempotence() {
    let reference = index(ROWS);

    let mut reversed: Vec<_> = ROWS.to_vec();
    reversed.reverse();
    assert_eq!(reference, index(&reversed));

    let doubled: Vec<_> = ROWS.iter().chain(ROWS.iter()).copied().collect();
    assert_eq!(reference, index(&doubled));
  }

  #[test]
  fn test_lookups() {
    let index = index(ROWS);

    assert!(index.has_global(GlobalAction::DatastoreCreate));

    // Wildcard and specific datastore grants union.
    assert!(index.has_datastore("D", DatastoreAction::DatastoreList));
    assert!(index.has_datastore("other", DatastoreAction::DatastoreList));
    assert!(index.has_datastore("D", DatastoreAction::TableCreate));
    assert!(!index.has_datastore("other", DatastoreAction::TableCreate));

    // Table lookups: global wildcard, per-datastore wildcard, specific.
    assert!(index.has_table("anything", "t", TableAction::TableList));
    assert!(index.has_table("D", "anything", TableAction::RowSelect));
    assert!(!index.has_table("other", "t", TableAction::RowSelect));
    assert!(index.has_table("D", "users", TableAction::RowUpdate));
    assert!(!index.has_table("D", "posts", TableAction::RowUpdate));

    // Column lookups.
    assert!(index.has_column("D", "users", "name", ColumnAction::Update));
    assert!(!index.has_column("D", "users", "age", ColumnAction::Update));
    assert!(index.has_column("D", "users", "age", ColumnAction::Select));
    assert!(index.has_column("any", "thing", "here", ColumnAction::Insert));

    assert!(index.has_all_columns("D", "users", ColumnAction::Select));
    assert!(!index.has_all_columns("D", "posts", ColumnAction::Select));
    assert!(index.has_all_columns("D", "posts", ColumnAction::Insert));
  }

  #[test]
  fn test_scope_mismatches_dropped() {
    // A column action on a table target must not grant anything.
    let index = index(&[
      ("datastore:D.table:users", "datastore.table.column.select"),
      ("datastore:D", "datastore.table.row.select"),
      ("*", "datastore.list"),
      ("datastore:D.table:users.column:c", "datastore.table.list"),
    ]);

    assert_eq!(index, PermissionIndex::default());
  }

  #[test]
  fn test_unindexed_wildcard_shapes_dropped() {
    // Documented choice: `datastore:D.table:*.column:*` is not stored;
    // neither are wildcards above named segments.
    let index = index(&[
      ("datastore:D.table:*.column:*", "datastore.table.column.select"),
      ("datastore:*.table:users", "datastore.table.row.select"),
      ("datastore:*.table:*.column:c", "datastore.table.column.select"),
    ]);

    assert_eq!(index, PermissionIndex::default());
  }

  #[test]
  fn test_malformed_rows_skipped() {
    let index = index(&[
      ("datastore:D.table:", "datastore.table.row.select"),
      ("bogus", "datastore.table.row.select"),
      ("datastore:D.table:users", "not.an.action"),
      ("datastore:D.table:users", "datastore.table.row.select"),
    ]);

    assert!(index.has_table("D", "users", TableAction::RowSelect));
    assert!(!index.has_table("D", "", TableAction::RowSelect));
  }

  #[test]
  fn test_monotonicity() {
    // Removing any row can only flip allow into deny.
    let full = index(ROWS);

    for skip in 0..ROWS.len() {
      let subset: Vec<_> = ROWS
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, row)| *row)
        .collect();
      let reduced = index(&subset);

      for table in ["users", "posts"] {
        for action in [TableAction::RowSelect, TableAction::RowUpdate] {
          if reduced.has_table("D", table, action) {
            assert!(full.has_table("D", table, action));
          }
        }
      }
      for column in ["name", "age"] {
        for action in [ColumnAction::Select, ColumnAction::Update] {
          if reduced.has_column("D", "users", column, action) {
            assert!(full.has_column("D", "users", column, action));
          }
        }
      }
    }
  }
}
