use log::*;
use thiserror::Error;

/// Publicly visible errors of the engine.
///
/// Kinds stay deliberately coarse so the transport layer has a clear
/// status mapping and internals don't leak. In particular `Forbidden`
/// never says which permission was missing.
/// NOTE: Do not use thiserror's #from, all mappings should be explicit.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("Forbidden")]
  Forbidden,
  #[error("Invalid identifier: {0}")]
  InvalidIdentifier(String),
  #[error("Unknown column: {0}")]
  UnknownColumn(String),
  #[error("Invalid filter: {0}")]
  InvalidFilter(&'static str),
  #[error("Guard violation: {0}")]
  GuardViolation(&'static str),
  #[error("Reserved identifier: {0}")]
  ReservedIdentifier(String),
  #[error("Schema mismatch: {0}")]
  SchemaMismatch(String),
  /// The external message is generic, the SQLite detail only reaches the
  /// log channel.
  #[error("Failed to execute statement")]
  ExecutionFailed,
}

impl EngineError {
  /// Wrap an underlying SQLite failure, logging the operational detail.
  pub(crate) fn execution(context: &'static str, err: rusqlite::Error) -> Self {
    warn!("{context}: {err}");
    return Self::ExecutionFailed;
  }
}

impl From<gridbase_schema::DdlError> for EngineError {
  fn from(err: gridbase_schema::DdlError) -> Self {
    return match err {
      gridbase_schema::DdlError::ReservedIdentifier(name) => Self::ReservedIdentifier(name),
    };
  }
}

impl From<gridbase_schema::ReflectError> for EngineError {
  fn from(err: gridbase_schema::ReflectError) -> Self {
    return match err {
      gridbase_schema::ReflectError::Sqlite(err) => Self::execution("schema reflection", err),
    };
  }
}
