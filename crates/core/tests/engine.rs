use anyhow::Result;
use rusqlite::types::Value;

use gridbase::authorize::authorize_sql;
use gridbase::connection::{DatastoreOptions, open_datastore};
use gridbase::content_range::{mutation_content_range, select_content_range};
use gridbase::perms::{CallerContext, PermissionIndex};
use gridbase::records::{
  DeleteQueryBuilder, InsertQueryBuilder, ListQueryBuilder, UpdateQueryBuilder, execute_delete,
  execute_insert, execute_list, execute_update, table_whitelist,
};
use gridbase::schema_filter::filter_schema;
use gridbase_qs::Query;
use gridbase_schema::reflect_schema;

fn init() {
  let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_discovery_respects_permission_union() -> Result<()> {
  init();

  let conn = rusqlite::Connection::open_in_memory()?;
  conn.execute_batch(
    "CREATE TABLE foo (id INTEGER, name TEXT);
     CREATE TABLE bar (id INTEGER);",
  )?;
  let schema = reflect_schema(&conn)?;

  let caller = CallerContext {
    organization_id: "org".to_string(),
    active_datastore_id: Some("D".to_string()),
    raw_permissions: vec![
      (
        "datastore:*.table:*".to_string(),
        "datastore.table.list".to_string(),
      ),
      (
        "datastore:D.table:foo".to_string(),
        "datastore.table.list".to_string(),
      ),
      (
        "datastore:D.table:foo.column:id".to_string(),
        "datastore.table.column.select".to_string(),
      ),
      (
        "datastore:*.table:*.column:*".to_string(),
        "datastore.table.column.select".to_string(),
      ),
    ],
  };
  let index = caller.permission_index();

  let visible = filter_schema(&schema, &index, "D");
  assert_eq!(
    visible.table("foo").unwrap().keys().collect::<Vec<_>>(),
    vec!["id", "name"]
  );
  assert_eq!(
    visible.table("bar").unwrap().keys().collect::<Vec<_>>(),
    vec!["id"]
  );

  return Ok(());
}

#[test]
fn test_crud_round_trip_against_datastore_file() -> Result<()> {
  init();

  let options = DatastoreOptions::new(tempdir()?);
  let mut conn = open_datastore(&options, "org-1")?;

  conn.execute_batch(
    "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, age INTEGER, status TEXT)",
  )?;

  let schema = reflect_schema(&conn)?;
  let valid_columns = table_whitelist(&schema, "users")?;
  assert!(matches!(
    table_whitelist(&schema, "missing"),
    Err(gridbase::EngineError::SchemaMismatch(_))
  ));

  // Insert a couple of rows through the bulk path.
  let rows: Vec<Vec<(String, Value)>> = [("alice", 30), ("bob", 17), ("carol", 41)]
    .into_iter()
    .map(|(name, age)| {
      return vec![
        ("name".to_string(), Value::Text(name.to_string())),
        ("age".to_string(), Value::Integer(age)),
        ("status".to_string(), Value::Text("active".to_string())),
      ];
    })
    .collect();
  let plan = InsertQueryBuilder::build("users", &rows, &valid_columns)?;
  let inserted = execute_insert(&mut conn, &plan)?;
  assert_eq!(inserted.inserted, 3);

  // PostgREST-style listing with the has-more probe.
  let query = Query::parse("age=gte.18&status=eq.active&order=name.asc&select=id,name,age");
  let built = ListQueryBuilder::build(
    "users",
    &query.filters,
    &query.order,
    1,
    0,
    query.select.as_deref(),
    &valid_columns,
  )?;
  let page = execute_list(&conn, &built, 1)?;
  assert!(page.has_more);
  assert_eq!(page.rows.rows.len(), 1);
  assert_eq!(select_content_range(0, page.rows.rows.len() as u64), "0-0/*");

  // Update through the guarded entrypoint, post-image comes back.
  let filter = Query::parse("name=eq.alice");
  let built = UpdateQueryBuilder::build(
    "users",
    &[("status".to_string(), Value::Text("retired".to_string()))],
    &filter.filters,
    &valid_columns,
  )?;
  let post_image = execute_update(&conn, &built)?;
  assert_eq!(post_image.rows.len(), 1);
  assert_eq!(mutation_content_range(post_image.rows.len() as u64), "0-0/1");

  let rowid_idx = post_image
    .columns
    .iter()
    .position(|c| c == "_rowid")
    .expect("synthetic rowid");
  let Value::Integer(rowid) = post_image.rows[0][rowid_idx] else {
    panic!("rowid must be an integer");
  };

  // And delete that row by its synthetic id.
  let built = DeleteQueryBuilder::build("users", &[rowid])?;
  assert_eq!(execute_delete(&conn, &built)?, 1);

  return Ok(());
}

#[test]
fn test_raw_sql_path_with_ddl_execution() -> Result<()> {
  init();

  let options = DatastoreOptions::new(tempdir()?);
  let conn = open_datastore(&options, "org-2")?;

  let index = PermissionIndex::from_rows([
    ("datastore:D", "datastore.table.create"),
    ("datastore:D.table:notes", "datastore.table.schema.change"),
    ("datastore:D.table:notes", "datastore.table.row.insert"),
    ("datastore:D.table:notes", "datastore.table.row.select"),
    ("datastore:D.table:notes.column:*", "datastore.table.column.insert"),
    ("datastore:D.table:notes.column:*", "datastore.table.column.select"),
  ]);

  // The protocol endpoint sends DDL; the authorizer normalizes it and the
  // DDL builder executes it.
  for sql in [
    "CREATE TABLE notes (ignored TEXT)",
    "ALTER TABLE notes ADD COLUMN body TEXT",
  ] {
    let decisions = authorize_sql(&index, "D", sql);
    assert_eq!(decisions.len(), 1, "{sql}");
    let decision = &decisions[0];
    assert!(decision.allowed, "{sql}");
    assert!(decision.is_ddl);

    let ddl = decision.operation.as_ref().expect("normalized op").build()?;
    conn.execute_batch(&ddl.forward)?;
  }

  // The created table carries only the synthetic PK plus the added column.
  let schema = reflect_schema(&conn)?;
  assert_eq!(
    schema.column_names("notes"),
    Some(vec!["_id".to_string(), "body".to_string()])
  );
  assert!(schema.table("notes").unwrap()["_id"].autoincrement);

  // DML through the same surface.
  let decisions = authorize_sql(&index, "D", "INSERT INTO notes (body) VALUES ('hi')");
  assert!(decisions[0].allowed && !decisions[0].is_ddl);
  conn.execute("INSERT INTO notes (body) VALUES ('hi')", [])?;

  let decisions = authorize_sql(&index, "D", "SELECT * FROM notes");
  assert!(decisions[0].allowed);

  // Dropping the table was never granted.
  let decisions = authorize_sql(&index, "D", "DROP TABLE notes");
  assert!(!decisions[0].allowed);

  return Ok(());
}

/// Minimal unique temp dir; std has no stable tempdir and the engine only
/// needs a writable directory.
fn tempdir() -> Result<std::path::PathBuf> {
  let dir = std::env::temp_dir().join(format!(
    "gridbase-test-{}-{}",
    std::process::id(),
    std::time::SystemTime::now()
      .duration_since(std::time::UNIX_EPOCH)?
      .as_nanos()
  ));
  std::fs::create_dir_all(&dir)?;
  return Ok(dir);
}
