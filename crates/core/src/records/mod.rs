mod builder;
mod executor;

pub use builder::{
  BuiltQuery, DeleteQueryBuilder, InsertPlan, InsertQueryBuilder, ListQueryBuilder,
  ROWID_ALIAS, ROWID_ALIAS_PG, UpdateQueryBuilder, limit_or_default, table_whitelist,
};
pub use executor::{
  InsertResult, ListResult, RowSet, execute_delete, execute_insert, execute_list, execute_update,
};
