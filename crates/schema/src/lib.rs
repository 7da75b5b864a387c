#![forbid(unsafe_code, clippy::unwrap_used)]
#![allow(clippy::needless_return)]
#![warn(clippy::await_holding_lock, clippy::inefficient_to_string)]

pub mod change;
pub mod parse;
pub mod reflect;
pub mod sqlite;

pub use change::{DdlError, SchemaChange, SchemaDdl};
pub use reflect::{ReflectError, reflect_schema};
pub use sqlite::{ColumnMeta, DbType, ForeignKeyRef, SchemaDocument, TableColumns};
