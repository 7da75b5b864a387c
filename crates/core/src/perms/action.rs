/// The closed action taxonomy. Every action belongs to exactly one scope
/// and is only honored on targets of that scope; the per-scope enums make
/// that a type-level fact instead of a runtime convention.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalAction {
  DatastoreCreate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatastoreAction {
  DatastoreList,
  DatastoreRename,
  DatastoreDrop,
  TableCreate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableAction {
  TableList,
  TableRename,
  TableDrop,
  SchemaChange,
  RowInsert,
  RowUpdate,
  RowDelete,
  RowSelect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnAction {
  Rename,
  Drop,
  Insert,
  Update,
  Delete,
  Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
  Global(GlobalAction),
  Datastore(DatastoreAction),
  Table(TableAction),
  Column(ColumnAction),
}

impl Action {
  /// Look up an action id. Unknown ids yield `None` and are dropped during
  /// indexing; they must never make any authorization succeed.
  pub fn from(id: &str) -> Option<Action> {
    use Action::*;

    return Some(match id {
      "datastore.create" => Global(GlobalAction::DatastoreCreate),

      "datastore.list" => Datastore(DatastoreAction::DatastoreList),
      "datastore.rename" => Datastore(DatastoreAction::DatastoreRename),
      "datastore.drop" => Datastore(DatastoreAction::DatastoreDrop),
      "datastore.table.create" => Datastore(DatastoreAction::TableCreate),

      "datastore.table.list" => Table(TableAction::TableList),
      "datastore.table.rename" => Table(TableAction::TableRename),
      "datastore.table.drop" => Table(TableAction::TableDrop),
      "datastore.table.schema.change" => Table(TableAction::SchemaChange),
      "datastore.table.row.insert" => Table(TableAction::RowInsert),
      "datastore.table.row.update" => Table(TableAction::RowUpdate),
      "datastore.table.row.delete" => Table(TableAction::RowDelete),
      "datastore.table.row.select" => Table(TableAction::RowSelect),

      "datastore.table.column.rename" => Column(ColumnAction::Rename),
      "datastore.table.column.drop" => Column(ColumnAction::Drop),
      "datastore.table.column.insert" => Column(ColumnAction::Insert),
      "datastore.table.column.update" => Column(ColumnAction::Update),
      "datastore.table.column.delete" => Column(ColumnAction::Delete),
      "datastore.table.column.select" => Column(ColumnAction::Select),

      _ => {
        return None;
      }
    });
  }

  pub fn as_str(&self) -> &'static str {
    return match self {
      Self::Global(GlobalAction::DatastoreCreate) => "datastore.create",

      Self::Datastore(DatastoreAction::DatastoreList) => "datastore.list",
      Self::Datastore(DatastoreAction::DatastoreRename) => "datastore.rename",
      Self::Datastore(DatastoreAction::DatastoreDrop) => "datastore.drop",
      Self::Datastore(DatastoreAction::TableCreate) => "datastore.table.create",

      Self::Table(TableAction::TableList) => "datastore.table.list",
      Self::Table(TableAction::TableRename) => "datastore.table.rename",
      Self::Table(TableAction::TableDrop) => "datastore.table.drop",
      Self::Table(TableAction::SchemaChange) => "datastore.table.schema.change",
      Self::Table(TableAction::RowInsert) => "datastore.table.row.insert",
      Self::Table(TableAction::RowUpdate) => "datastore.table.row.update",
      Self::Table(TableAction::RowDelete) => "datastore.table.row.delete",
      Self::Table(TableAction::RowSelect) => "datastore.table.row.select",

      Self::Column(ColumnAction::Rename) => "datastore.table.column.rename",
      Self::Column(ColumnAction::Drop) => "datastore.table.column.drop",
      Self::Column(ColumnAction::Insert) => "datastore.table.column.insert",
      Self::Column(ColumnAction::Update) => "datastore.table.column.update",
      Self::Column(ColumnAction::Delete) => "datastore.table.column.delete",
      Self::Column(ColumnAction::Select) => "datastore.table.column.select",
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ALL: &[&str] = &[
    "datastore.create",
    "datastore.list",
    "datastore.rename",
    "datastore.drop",
    "datastore.table.create",
    "datastore.table.list",
    "datastore.table.rename",
    "datastore.table.drop",
    "datastore.table.schema.change",
    "datastore.table.row.insert",
    "datastore.table.row.update",
    "datastore.table.row.delete",
    "datastore.table.row.select",
    "datastore.table.column.rename",
    "datastore.table.column.drop",
    "datastore.table.column.insert",
    "datastore.table.column.update",
    "datastore.table.column.delete",
    "datastore.table.column.select",
  ];

  #[test]
  fn test_action_round_trip() {
    for id in ALL {
      assert_eq!(Action::from(id).unwrap().as_str(), *id);
    }
  }

  #[test]
  fn test_unknown_actions_rejected() {
    assert_eq!(Action::from("datastore.table.row.upsert"), None);
    assert_eq!(Action::from("datastore.table.truncate"), None);
    assert_eq!(Action::from(""), None);
  }
}
