mod action;
mod index;
mod target;

pub use action::{Action, ColumnAction, DatastoreAction, GlobalAction, TableAction};
pub use index::PermissionIndex;
pub use target::{Segment, Target, parse_target};

use serde::Deserialize;

/// Resolved caller identity as handed over by the host once the API key
/// or session has been authenticated.
#[derive(Clone, Debug, Deserialize)]
pub struct CallerContext {
  pub organization_id: String,
  pub active_datastore_id: Option<String>,
  /// Raw `(target, action)` rows from the permission store.
  pub raw_permissions: Vec<(String, String)>,
}

impl CallerContext {
  /// Build the per-request permission index.
  pub fn permission_index(&self) -> PermissionIndex {
    return PermissionIndex::from_rows(
      self
        .raw_permissions
        .iter()
        .map(|(target, action)| (target.as_str(), action.as_str())),
    );
  }
}
