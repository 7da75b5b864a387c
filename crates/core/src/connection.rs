use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use serde::Deserialize;

use crate::error::EngineError;

fn default_busy_timeout_ms() -> u64 {
  return 5000;
}

/// Host-provided datastore layout: one SQLite file per datastore under
/// `root_dir`, named by datastore id.
#[derive(Clone, Debug, Deserialize)]
pub struct DatastoreOptions {
  pub root_dir: PathBuf,
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

impl DatastoreOptions {
  pub fn new(root_dir: impl Into<PathBuf>) -> Self {
    return DatastoreOptions {
      root_dir: root_dir.into(),
      busy_timeout_ms: default_busy_timeout_ms(),
    };
  }

  pub fn datastore_path(&self, datastore_id: &str) -> PathBuf {
    return self.root_dir.join(format!("{datastore_id}.db"));
  }
}

/// Open (or create) the SQLite file backing a datastore and apply the
/// per-connection pragmas the engine relies on.
pub fn open_datastore(
  options: &DatastoreOptions,
  datastore_id: &str,
) -> Result<Connection, EngineError> {
  // Ids become file names; a traversal-capable id must never reach the
  // filesystem layer.
  let valid = !datastore_id.is_empty()
    && datastore_id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if !valid {
    return Err(EngineError::InvalidIdentifier(datastore_id.to_string()));
  }

  let conn = Connection::open(options.datastore_path(datastore_id))
    .map_err(|err| EngineError::execution("open datastore", err))?;

  apply_default_pragmas(&conn, Duration::from_millis(options.busy_timeout_ms))
    .map_err(|err| EngineError::execution("apply pragmas", err))?;

  return Ok(conn);
}

/// Guaranteed for the connection's lifetime:
///  * WAL allows concurrent readers beside the single writer.
///  * `busy_timeout` absorbs short writer contention instead of erroring.
///  * `synchronous=NORMAL` is durable enough under WAL.
///  * Foreign keys default to OFF in SQLite; referential integrity only
///    holds if every connection opts in.
pub fn apply_default_pragmas(
  conn: &Connection,
  busy_timeout: Duration,
) -> Result<(), rusqlite::Error> {
  conn.pragma_update(None, "journal_mode", "WAL")?;
  conn.pragma_update(None, "busy_timeout", busy_timeout.as_millis() as i64)?;
  conn.pragma_update(None, "synchronous", "NORMAL")?;
  conn.pragma_update(None, "foreign_keys", "ON")?;
  return Ok(());
}
