use gridbase_schema::{SchemaDocument, TableColumns};

use crate::perms::{ColumnAction, PermissionIndex, TableAction};

/// Project a datastore's canonical schema down to what the caller may
/// discover: tables they can list, columns they can select. A listable
/// table with no selectable columns stays in the output with an empty
/// column map, its existence is discoverable even if its data isn't.
pub fn filter_schema(
  schema: &SchemaDocument,
  index: &PermissionIndex,
  datastore_id: &str,
) -> SchemaDocument {
  let mut filtered = SchemaDocument::default();

  for (table_name, columns) in &schema.tables {
    if !index.has_table(datastore_id, table_name, TableAction::TableList) {
      continue;
    }

    let visible: TableColumns = columns
      .iter()
      .filter(|(column_name, _)| {
        return index.has_column(datastore_id, table_name, column_name, ColumnAction::Select);
      })
      .map(|(name, meta)| (name.clone(), meta.clone()))
      .collect();

    filtered.tables.insert(table_name.clone(), visible);
  }

  return filtered;
}
