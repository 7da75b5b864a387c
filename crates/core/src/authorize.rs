use std::collections::{HashMap, HashSet};

use gridbase_schema::parse::parse_into_statements;
use gridbase_schema::{DbType, ForeignKeyRef, SchemaChange};
use log::*;
use sqlite3_parser::ast::{
  AlterTableBody, As, ColumnConstraint, Expr, ForeignKeyClause, FromClause, Id, InsertBody,
  JoinConstraint, Name, OneSelect, QualifiedName, RefAct, RefArg, ResultColumn, Select,
  SelectTable, Stmt,
};

use crate::perms::{ColumnAction, DatastoreAction, PermissionIndex, TableAction};

/// Per-statement authorization verdict. A parse failure, an unsupported
/// construct or any missing grant all surface as `allowed: false`; the
/// authorizer never raises and callers treat any `false` as a hard
/// reject. DDL statements additionally carry the normalized schema
/// change so the caller can execute through the DDL builder without
/// re-parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct StatementDecision {
  pub allowed: bool,
  pub is_ddl: bool,
  pub operation: Option<SchemaChange>,
}

impl StatementDecision {
  fn denied() -> Self {
    return StatementDecision {
      allowed: false,
      is_ddl: false,
      operation: None,
    };
  }

  fn dml(allowed: bool) -> Self {
    return StatementDecision {
      allowed,
      is_ddl: false,
      operation: None,
    };
  }

  fn ddl(allowed: bool, operation: SchemaChange) -> Self {
    return StatementDecision {
      allowed,
      is_ddl: true,
      operation: Some(operation),
    };
  }
}

/// Authorize a raw SQL text against a caller's permission index: one
/// decision per parsed statement, in order. A text that doesn't parse at
/// all yields a single denial.
pub fn authorize_sql(
  index: &PermissionIndex,
  datastore_id: &str,
  sql: &str,
) -> Vec<StatementDecision> {
  let statements = match parse_into_statements(sql) {
    Ok(statements) => statements,
    Err(err) => {
      debug!("rejecting unparseable SQL: {err}");
      return vec![StatementDecision::denied()];
    }
  };

  return statements
    .iter()
    .map(|stmt| authorize_statement(index, datastore_id, stmt))
    .collect();
}

fn authorize_statement(
  index: &PermissionIndex,
  datastore_id: &str,
  stmt: &Stmt,
) -> StatementDecision {
  match stmt {
    Stmt::Select(select) => {
      let mut scope = StatementScope::default();
      scope.walk_select(select);
      return StatementDecision::dml(scope.authorize(index, datastore_id));
    }

    Stmt::Insert {
      with,
      tbl_name,
      columns,
      body,
      returning,
      ..
    } => {
      let mut scope = StatementScope::default();
      if let Some(with) = with {
        scope.walk_with(with);
      }

      let target = scope.record_target(tbl_name, TableRole::Insert);

      match columns {
        Some(columns) => {
          for column in columns.iter() {
            scope.record_column(Some(target.clone()), unquote_name(column), ColumnRole::Insert);
          }
        }
        // No explicit column list writes every column of the table.
        None => scope.record_star(Some(target.clone()), ColumnRole::Insert),
      }

      match body {
        InsertBody::Select(select, upsert) => {
          if upsert.is_some() {
            scope.unsupported = true;
          }
          scope.walk_select(select);
        }
        InsertBody::DefaultValues => {}
      }

      scope.walk_returning(returning, &target);
      return StatementDecision::dml(scope.authorize(index, datastore_id));
    }

    Stmt::Update {
      with,
      tbl_name,
      sets,
      from,
      where_clause,
      returning,
      order_by,
      limit,
      ..
    } => {
      let mut scope = StatementScope::default();
      if let Some(with) = with {
        scope.walk_with(with);
      }

      let target = scope.record_target(tbl_name, TableRole::Update);

      for set in sets {
        for column in set.col_names.iter() {
          scope.record_column(Some(target.clone()), unquote_name(column), ColumnRole::Update);
        }
        scope.walk_expr(&set.expr, ColumnRole::Select);
      }

      if let Some(from) = from {
        scope.walk_from(from);
      }
      if let Some(where_clause) = where_clause {
        scope.walk_expr(where_clause, ColumnRole::Select);
      }
      scope.walk_returning(returning, &target);
      if let Some(order_by) = order_by {
        for sorted in order_by {
          scope.walk_expr(&sorted.expr, ColumnRole::Select);
        }
      }
      if let Some(limit) = limit {
        scope.walk_expr(&limit.expr, ColumnRole::Select);
        if let Some(offset) = &limit.offset {
          scope.walk_expr(offset, ColumnRole::Select);
        }
      }

      return StatementDecision::dml(scope.authorize(index, datastore_id));
    }

    Stmt::Delete {
      with,
      tbl_name,
      where_clause,
      returning,
      order_by,
      limit,
      ..
    } => {
      let mut scope = StatementScope::default();
      if let Some(with) = with {
        scope.walk_with(with);
      }

      let target = scope.record_target(tbl_name, TableRole::Delete);

      if let Some(where_clause) = where_clause {
        scope.walk_expr(where_clause, ColumnRole::Select);
      }
      scope.walk_returning(returning, &target);
      if let Some(order_by) = order_by {
        for sorted in order_by {
          scope.walk_expr(&sorted.expr, ColumnRole::Select);
        }
      }
      if let Some(limit) = limit {
        scope.walk_expr(&limit.expr, ColumnRole::Select);
        if let Some(offset) = &limit.offset {
          scope.walk_expr(offset, ColumnRole::Select);
        }
      }

      return StatementDecision::dml(scope.authorize(index, datastore_id));
    }

    Stmt::CreateTable { tbl_name, .. } => {
      let table = unquote_name(&tbl_name.name);
      let allowed = index.has_datastore(datastore_id, DatastoreAction::TableCreate);
      return StatementDecision::ddl(allowed, SchemaChange::AddTable { table });
    }

    Stmt::DropTable { tbl_name, .. } => {
      let table = unquote_name(&tbl_name.name);
      let allowed = index.has_table(datastore_id, &table, TableAction::TableDrop);
      return StatementDecision::ddl(allowed, SchemaChange::DropTable { table });
    }

    Stmt::AlterTable(tbl_name, body) => {
      return authorize_alter_table(index, datastore_id, &unquote_name(&tbl_name.name), body);
    }

    // Everything else (transactions, pragmas, attach, views, indexes,
    // triggers, vacuum, ...) is outside the authorized surface.
    _ => {
      debug!("denying unsupported statement kind");
      return StatementDecision::denied();
    }
  }
}

fn authorize_alter_table(
  index: &PermissionIndex,
  datastore_id: &str,
  table: &str,
  body: &AlterTableBody,
) -> StatementDecision {
  let schema_change = index.has_table(datastore_id, table, TableAction::SchemaChange);

  match body {
    AlterTableBody::RenameTo(new_name) => {
      let allowed =
        schema_change && index.has_table(datastore_id, table, TableAction::TableRename);
      return StatementDecision::ddl(
        allowed,
        SchemaChange::RenameTable {
          table: table.to_string(),
          new_name: unquote_name(new_name),
        },
      );
    }

    AlterTableBody::RenameColumn { old, new } => {
      let column = unquote_name(old);
      let allowed = schema_change
        && index.has_column(datastore_id, table, &column, ColumnAction::Rename);
      return StatementDecision::ddl(
        allowed,
        SchemaChange::RenameColumn {
          table: table.to_string(),
          column,
          new_name: unquote_name(new),
        },
      );
    }

    AlterTableBody::DropColumn(name) => {
      let column = unquote_name(name);
      let allowed =
        schema_change && index.has_column(datastore_id, table, &column, ColumnAction::Drop);
      return StatementDecision::ddl(
        allowed,
        SchemaChange::DropColumn {
          table: table.to_string(),
          column,
        },
      );
    }

    AlterTableBody::AddColumn(definition) => {
      let Some(operation) = normalize_add_column(table, definition) else {
        // Constraints the schema-change vocabulary can't express.
        return StatementDecision::denied();
      };
      return StatementDecision::ddl(schema_change, operation);
    }

    _ => {
      debug!("denying unsupported ALTER TABLE form");
      return StatementDecision::denied();
    }
  }
}

/// `ADD COLUMN name TYPE [REFERENCES ft(fc) [ON … …]]`. Anything beyond a
/// single foreign-key clause fails normalization.
fn normalize_add_column(
  table: &str,
  definition: &sqlite3_parser::ast::ColumnDefinition,
) -> Option<SchemaChange> {
  let db_type = definition
    .col_type
    .as_ref()
    .map_or(DbType::Text, |t| DbType::from_type_name(&t.name));

  let mut foreign_key: Option<ForeignKeyRef> = None;
  for named in &definition.constraints {
    match &named.constraint {
      ColumnConstraint::ForeignKey { clause, .. } if foreign_key.is_none() => {
        foreign_key = Some(foreign_key_ref(clause));
      }
      _ => {
        return None;
      }
    }
  }

  return Some(SchemaChange::AddColumn {
    table: table.to_string(),
    column: unquote_name(&definition.col_name),
    db_type,
    foreign_key,
  });
}

fn foreign_key_ref(clause: &ForeignKeyClause) -> ForeignKeyRef {
  let mut on_update: Option<String> = None;
  let mut on_delete: Option<String> = None;
  for arg in &clause.args {
    match arg {
      RefArg::OnUpdate(action) => on_update = Some(ref_act_fragment(action).to_string()),
      RefArg::OnDelete(action) => on_delete = Some(ref_act_fragment(action).to_string()),
      _ => {}
    }
  }

  return ForeignKeyRef {
    table: unquote_name(&clause.tbl_name),
    column: clause
      .columns
      .as_ref()
      .and_then(|columns| columns.first())
      .map(|column| unquote_name(&column.col_name))
      .unwrap_or_default(),
    on_update,
    on_delete,
  };
}

fn ref_act_fragment(action: &RefAct) -> &'static str {
  return match action {
    RefAct::Restrict => "RESTRICT",
    RefAct::Cascade => "CASCADE",
    RefAct::SetNull => "SET NULL",
    RefAct::NoAction => "NO ACTION",
    RefAct::SetDefault => "SET DEFAULT",
  };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum TableRole {
  Select,
  Insert,
  Update,
  Delete,
}

impl TableRole {
  fn required_action(&self) -> TableAction {
    return match self {
      Self::Select => TableAction::RowSelect,
      Self::Insert => TableAction::RowInsert,
      Self::Update => TableAction::RowUpdate,
      Self::Delete => TableAction::RowDelete,
    };
  }
}

/// Role a column plays. Ordered so that a write role wins when the same
/// column is referenced several ways, e.g. `UPDATE t SET c = … WHERE c …`
/// needs `column.update` on `c` but not additionally `column.select`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnRole {
  Select,
  Insert,
  Update,
}

impl ColumnRole {
  fn required_action(&self) -> ColumnAction {
    return match self {
      Self::Select => ColumnAction::Select,
      Self::Insert => ColumnAction::Insert,
      Self::Update => ColumnAction::Update,
    };
  }
}

/// Spellings that address the row identity rather than a declared
/// column; covered by the table-level row action.
fn is_rowid_spelling(name: &str) -> bool {
  let lower = name.to_lowercase();
  return lower == "rowid" || lower == "_rowid_" || lower == "oid" || lower == "_rowid";
}

/// Everything one statement touches. The scope is flat: subquery tables
/// and columns land in the same sets, matching the documented
/// "accessible in at least one referenced table" rule for unqualified
/// names.
#[derive(Default)]
struct StatementScope {
  /// Referenced concrete tables with the role of each reference.
  tables: HashSet<(String, TableRole)>,
  /// alias (or bare name) → table name.
  aliases: HashMap<String, String>,
  /// FROM-clause subquery aliases; references through them degrade to
  /// unqualified since the underlying tables were walked already.
  subquery_aliases: HashSet<String>,
  cte_names: HashSet<String>,
  /// (raw qualifier, column) → role, merged with write precedence.
  columns: Vec<(Option<String>, String, ColumnRole)>,
  stars: Vec<(Option<String>, ColumnRole)>,
  unsupported: bool,
}

impl StatementScope {
  fn record_target(&mut self, tbl_name: &QualifiedName, role: TableRole) -> String {
    let table = unquote_name(&tbl_name.name);
    self.tables.insert((table.clone(), role));
    self.aliases.insert(table.clone(), table.clone());
    if let Some(alias) = &tbl_name.alias {
      self.aliases.insert(unquote_name(alias), table.clone());
    }
    return table;
  }

  fn record_table(&mut self, tbl_name: &QualifiedName, alias: Option<&As>, role: TableRole) {
    let name = unquote_name(&tbl_name.name);
    if self.cte_names.contains(&name) {
      if let Some(alias) = alias_name(alias) {
        self.subquery_aliases.insert(alias);
      }
      return;
    }

    self.tables.insert((name.clone(), role));
    self.aliases.insert(name.clone(), name.clone());
    if let Some(alias) = alias_name(alias) {
      self.aliases.insert(alias, name.clone());
    }
  }

  fn record_column(&mut self, qualifier: Option<String>, column: String, role: ColumnRole) {
    self.columns.push((qualifier, column, role));
  }

  fn record_star(&mut self, table: Option<String>, role: ColumnRole) {
    self.stars.push((table, role));
  }

  fn walk_with(&mut self, with: &sqlite3_parser::ast::With) {
    for cte in &with.ctes {
      self.cte_names.insert(unquote_name(&cte.tbl_name));
      self.walk_select(&cte.select);
    }
  }

  fn walk_select(&mut self, select: &Select) {
    if let Some(with) = &select.with {
      self.walk_with(with);
    }

    self.walk_one_select(&select.body.select);
    if let Some(compounds) = &select.body.compounds {
      for compound in compounds {
        self.walk_one_select(&compound.select);
      }
    }

    if let Some(order_by) = &select.order_by {
      for sorted in order_by {
        self.walk_expr(&sorted.expr, ColumnRole::Select);
      }
    }
    if let Some(limit) = &select.limit {
      self.walk_expr(&limit.expr, ColumnRole::Select);
      if let Some(offset) = &limit.offset {
        self.walk_expr(offset, ColumnRole::Select);
      }
    }
  }

  fn walk_one_select(&mut self, one_select: &OneSelect) {
    match one_select {
      OneSelect::Select {
        columns,
        from,
        where_clause,
        group_by,
        having,
        window_clause,
        ..
      } => {
        if window_clause.is_some() {
          // Window definitions carry column references this walker
          // doesn't extract.
          self.unsupported = true;
        }

        if let Some(from) = from {
          self.walk_from(from);
        }
        for result_column in columns {
          self.walk_result_column(result_column, None);
        }
        if let Some(where_clause) = where_clause {
          self.walk_expr(where_clause, ColumnRole::Select);
        }
        if let Some(group_by) = group_by {
          for expr in group_by {
            self.walk_expr(expr, ColumnRole::Select);
          }
        }
        if let Some(having) = having {
          self.walk_expr(having, ColumnRole::Select);
        }
      }
      OneSelect::Values(rows) => {
        for row in rows {
          for expr in row {
            self.walk_expr(expr, ColumnRole::Select);
          }
        }
      }
    }
  }

  fn walk_from(&mut self, from: &FromClause) {
    if let Some(select_table) = &from.select {
      self.walk_select_table(select_table);
    }
    if let Some(joins) = &from.joins {
      for join in joins {
        self.walk_select_table(&join.table);
        match &join.constraint {
          Some(JoinConstraint::On(expr)) => self.walk_expr(expr, ColumnRole::Select),
          Some(JoinConstraint::Using(names)) => {
            for name in names.iter() {
              self.record_column(None, unquote_name(name), ColumnRole::Select);
            }
          }
          None => {}
        }
      }
    }
  }

  fn walk_select_table(&mut self, select_table: &SelectTable) {
    match select_table {
      SelectTable::Table(tbl_name, alias, _indexed) => {
        self.record_table(tbl_name, alias.as_ref(), TableRole::Select);
      }
      SelectTable::Select(subselect, alias) => {
        if let Some(alias) = alias_name(alias.as_ref()) {
          self.subquery_aliases.insert(alias);
        }
        self.walk_select(subselect);
      }
      SelectTable::Sub(from, alias) => {
        if let Some(alias) = alias_name(alias.as_ref()) {
          self.subquery_aliases.insert(alias);
        }
        self.walk_from(from);
      }
      // Table-valued functions aren't authorized tables.
      SelectTable::TableCall(..) => {
        self.unsupported = true;
      }
    }
  }

  fn walk_result_column(&mut self, result_column: &ResultColumn, star_table: Option<&str>) {
    match result_column {
      ResultColumn::Star => {
        self.record_star(star_table.map(String::from), ColumnRole::Select);
      }
      ResultColumn::TableStar(name) => {
        self.record_star(Some(unquote_name(name)), ColumnRole::Select);
      }
      ResultColumn::Expr(expr, _alias) => {
        self.walk_expr(expr, ColumnRole::Select);
      }
    }
  }

  fn walk_returning(&mut self, returning: &Option<Vec<ResultColumn>>, target: &str) {
    if let Some(returning) = returning {
      for result_column in returning {
        self.walk_result_column(result_column, Some(target));
      }
    }
  }

  fn walk_expr(&mut self, expr: &Expr, role: ColumnRole) {
    match expr {
      Expr::Id(id) => {
        let name = unquote_id(id);
        if !is_rowid_spelling(&name) {
          self.record_column(None, name, role);
        }
      }
      Expr::Name(name) => {
        let name = unquote_name(name);
        if !is_rowid_spelling(&name) {
          self.record_column(None, name, role);
        }
      }
      Expr::Qualified(qualifier, name) => {
        let name = unquote_name(name);
        if !is_rowid_spelling(&name) {
          self.record_column(Some(unquote_name(qualifier)), name, role);
        }
      }
      Expr::DoublyQualified(_db, qualifier, name) => {
        let name = unquote_name(name);
        if !is_rowid_spelling(&name) {
          self.record_column(Some(unquote_name(qualifier)), name, role);
        }
      }

      Expr::Binary(lhs, _op, rhs) => {
        self.walk_expr(lhs, role);
        self.walk_expr(rhs, role);
      }
      Expr::Unary(_op, expr) => self.walk_expr(expr, role),
      Expr::Parenthesized(exprs) => {
        for expr in exprs {
          self.walk_expr(expr, role);
        }
      }
      Expr::IsNull(expr) | Expr::NotNull(expr) => self.walk_expr(expr, role),
      Expr::Collate(expr, _collation) => self.walk_expr(expr, role),
      Expr::Cast { expr, .. } => self.walk_expr(expr, role),
      Expr::Like {
        lhs, rhs, escape, ..
      } => {
        self.walk_expr(lhs, role);
        self.walk_expr(rhs, role);
        if let Some(escape) = escape {
          self.walk_expr(escape, role);
        }
      }
      Expr::Between {
        lhs, start, end, ..
      } => {
        self.walk_expr(lhs, role);
        self.walk_expr(start, role);
        self.walk_expr(end, role);
      }
      Expr::Case {
        base,
        when_then_pairs,
        else_expr,
        ..
      } => {
        if let Some(base) = base {
          self.walk_expr(base, role);
        }
        for (when, then) in when_then_pairs {
          self.walk_expr(when, role);
          self.walk_expr(then, role);
        }
        if let Some(else_expr) = else_expr {
          self.walk_expr(else_expr, role);
        }
      }
      Expr::FunctionCall { args, .. } => {
        if let Some(args) = args {
          for arg in args {
            self.walk_expr(arg, role);
          }
        }
      }
      // COUNT(*) and friends touch no particular column.
      Expr::FunctionCallStar { .. } => {}

      Expr::InList { lhs, rhs, .. } => {
        self.walk_expr(lhs, role);
        if let Some(rhs) = rhs {
          for expr in rhs {
            self.walk_expr(expr, role);
          }
        }
      }
      Expr::InSelect { lhs, rhs, .. } => {
        self.walk_expr(lhs, role);
        self.walk_select(rhs);
      }
      Expr::InTable {
        lhs, rhs, args, ..
      } => {
        self.walk_expr(lhs, role);
        self.record_table(rhs, None, TableRole::Select);
        if let Some(args) = args {
          for expr in args {
            self.walk_expr(expr, role);
          }
        }
      }
      Expr::Exists(select) | Expr::Subquery(select) => self.walk_select(select),

      Expr::Literal(_) | Expr::Variable(_) | Expr::Raise(..) => {}

      _ => {
        self.unsupported = true;
      }
    }
  }

  /// Check every recorded reference against the index.
  fn authorize(self, index: &PermissionIndex, datastore_id: &str) -> bool {
    if self.unsupported {
      return false;
    }

    for (table, role) in &self.tables {
      if !index.has_table(datastore_id, table, role.required_action()) {
        return false;
      }
    }

    let table_names: HashSet<&str> = self.tables.iter().map(|(name, _)| name.as_str()).collect();
    // With exactly one referenced table every unqualified name is that
    // table's; otherwise the documented at-least-one rule applies.
    let single_table = if table_names.len() == 1 {
      table_names.iter().next().copied()
    } else {
      None
    };

    let resolve = |qualifier: &Option<String>| -> Option<String> {
      let Some(qualifier) = qualifier else {
        return single_table.map(String::from);
      };
      if self.subquery_aliases.contains(qualifier) || self.cte_names.contains(qualifier) {
        return single_table.map(String::from);
      }
      return Some(
        self
          .aliases
          .get(qualifier)
          .cloned()
          .unwrap_or_else(|| qualifier.clone()),
      );
    };

    // Merge per (table, column) with write-role precedence.
    let mut merged = HashMap::<(Option<String>, String), ColumnRole>::new();
    for (qualifier, column, role) in &self.columns {
      let key = (resolve(qualifier), column.clone());
      merged
        .entry(key)
        .and_modify(|existing| *existing = (*existing).max(*role))
        .or_insert(*role);
    }

    for ((table, column), role) in &merged {
      let action = role.required_action();
      let granted = match table {
        Some(table) => index.has_column(datastore_id, table, column, action),
        None => table_names
          .iter()
          .any(|table| index.has_column(datastore_id, table, column, action)),
      };
      if !granted {
        return false;
      }
    }

    for (table, role) in &self.stars {
      let action = role.required_action();
      let granted = match resolve(table) {
        Some(table) => index.has_all_columns(datastore_id, &table, action),
        // An unqualified star spans every referenced table.
        None => {
          !table_names.is_empty()
            && table_names
              .iter()
              .all(|table| index.has_all_columns(datastore_id, table, action))
        }
      };
      if !granted {
        return false;
      }
    }

    return true;
  }
}

fn alias_name(alias: Option<&As>) -> Option<String> {
  return alias.map(|a| match a {
    As::As(name) => unquote_name(name),
    As::Elided(name) => unquote_name(name),
  });
}

#[inline]
fn unquote_string(s: &str) -> String {
  let bytes = s.as_bytes();
  if bytes.is_empty() {
    return String::new();
  }

  return match bytes[0] {
    b'"' | b'`' | b'\'' | b'[' if bytes.len() >= 2 => s[1..bytes.len() - 1].to_string(),
    _ => s.to_string(),
  };
}

fn unquote_name(name: &Name) -> String {
  return unquote_string(&name.0);
}

fn unquote_id(id: &Id) -> String {
  return unquote_string(&id.0);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn index(rows: &[(&str, &str)]) -> PermissionIndex {
    return PermissionIndex::from_rows(rows.iter().copied());
  }

  fn decide(rows: &[(&str, &str)], sql: &str) -> StatementDecision {
    let decisions = authorize_sql(&index(rows), "D", sql);
    assert_eq!(decisions.len(), 1, "{sql}");
    return decisions.into_iter().next().unwrap();
  }

  fn allowed(rows: &[(&str, &str)], sql: &str) -> bool {
    return decide(rows, sql).allowed;
  }

  #[test]
  fn test_select_requires_row_and_column_grants() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:users.column:id", "datastore.table.column.select"),
      ("datastore:D.table:users.column:name", "datastore.table.column.select"),
    ];

    assert!(allowed(rows, "SELECT id, name FROM users"));
    assert!(allowed(rows, "SELECT name FROM users WHERE id > 5 ORDER BY name"));
    // `age` has no column grant.
    assert!(!allowed(rows, "SELECT age FROM users"));
    assert!(!allowed(rows, "SELECT name FROM users WHERE age > 5"));
    // No row grant on posts.
    assert!(!allowed(rows, "SELECT id FROM posts"));
    // Wrong datastore.
    assert!(
      !authorize_sql(&index(rows), "other", "SELECT id FROM users")[0].allowed
    );
  }

  #[test]
  fn test_select_star_requires_all_columns() {
    let per_column: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:users.column:id", "datastore.table.column.select"),
    ];
    assert!(!allowed(per_column, "SELECT * FROM users"));

    let all_columns: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:users.column:*", "datastore.table.column.select"),
    ];
    assert!(allowed(all_columns, "SELECT * FROM users"));
    assert!(allowed(all_columns, "SELECT users.* FROM users"));
    assert!(allowed(all_columns, "SELECT COUNT(*) FROM users"));
  }

  #[test]
  fn test_update_filter_column_precedence() {
    // Grants: row.update on users, column.update on users.name only.
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.update"),
      ("datastore:D.table:users.column:name", "datastore.table.column.update"),
    ];

    // WHERE touches `age` which has neither select nor update.
    assert!(!allowed(rows, "UPDATE users SET name = 'x' WHERE age > 18"));
    // The update grant on `name` covers its WHERE appearance too.
    assert!(allowed(rows, "UPDATE users SET name = 'x' WHERE name <> 'y'"));
  }

  #[test]
  fn test_update_requires_set_grants() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.update"),
      ("datastore:D.table:users.column:name", "datastore.table.column.update"),
    ];

    assert!(!allowed(rows, "UPDATE users SET age = 1 WHERE name = 'x'"));
    // Missing row.update entirely.
    assert!(!allowed(
      &[("datastore:D.table:users.column:name", "datastore.table.column.update")],
      "UPDATE users SET name = 'x' WHERE name = 'y'"
    ));
  }

  #[test]
  fn test_delete_with_subquery() {
    let full: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.delete"),
      ("datastore:D.table:banned", "datastore.table.row.select"),
      ("datastore:D.table:users.column:id", "datastore.table.column.select"),
      ("datastore:D.table:banned.column:user_id", "datastore.table.column.select"),
    ];
    let sql = "DELETE FROM users WHERE id IN (SELECT user_id FROM banned)";

    assert!(allowed(full, sql));

    // Dropping any one grant flips the decision.
    for skip in 0..full.len() {
      let subset: Vec<_> = full
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, row)| *row)
        .collect();
      assert!(!allowed(&subset, sql), "row {skip} should be load-bearing");
    }
  }

  #[test]
  fn test_insert_column_lists() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.insert"),
      ("datastore:D.table:users.column:name", "datastore.table.column.insert"),
    ];

    assert!(allowed(rows, "INSERT INTO users (name) VALUES ('x')"));
    assert!(!allowed(rows, "INSERT INTO users (name, age) VALUES ('x', 1)"));
    // Implicit full column list needs an all-columns insert grant.
    assert!(!allowed(rows, "INSERT INTO users VALUES ('x', 1)"));

    let all: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.insert"),
      ("datastore:D.table:users.column:*", "datastore.table.column.insert"),
    ];
    assert!(allowed(all, "INSERT INTO users VALUES ('x', 1)"));
  }

  #[test]
  fn test_insert_select_reads_source() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:archive", "datastore.table.row.insert"),
      ("datastore:D.table:archive.column:name", "datastore.table.column.insert"),
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:users.column:name", "datastore.table.column.select"),
    ];

    assert!(allowed(
      rows,
      "INSERT INTO archive (name) SELECT name FROM users"
    ));

    // Without read access on the source table.
    assert!(!allowed(
      &rows[..2],
      "INSERT INTO archive (name) SELECT name FROM users"
    ));
  }

  #[test]
  fn test_join_and_qualified_references() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:posts", "datastore.table.row.select"),
      ("datastore:D.table:users.column:id", "datastore.table.column.select"),
      ("datastore:D.table:users.column:name", "datastore.table.column.select"),
      ("datastore:D.table:posts.column:user_id", "datastore.table.column.select"),
    ];

    assert!(allowed(
      rows,
      "SELECT u.name FROM users AS u JOIN posts AS p ON u.id = p.user_id"
    ));

    // Unqualified `name` resolves via the at-least-one rule.
    assert!(allowed(
      rows,
      "SELECT name FROM users JOIN posts ON users.id = posts.user_id"
    ));

    // `p.title` is qualified and posts.title isn't granted.
    assert!(!allowed(
      rows,
      "SELECT p.title FROM users AS u JOIN posts AS p ON u.id = p.user_id"
    ));
  }

  #[test]
  fn test_ddl_normalization() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D", "datastore.table.create"),
      ("datastore:D.table:orders", "datastore.table.schema.change"),
      ("datastore:D.table:orders", "datastore.table.rename"),
      ("datastore:D.table:orders", "datastore.table.drop"),
      ("datastore:D.table:orders.column:state", "datastore.table.column.rename"),
      ("datastore:D.table:orders.column:state", "datastore.table.column.drop"),
    ];

    let decision = decide(rows, "CREATE TABLE notes (x TEXT)");
    assert!(decision.allowed && decision.is_ddl);
    assert_eq!(
      decision.operation,
      Some(SchemaChange::AddTable {
        table: "notes".to_string()
      })
    );

    let decision = decide(rows, "DROP TABLE orders");
    assert!(decision.allowed && decision.is_ddl);
    assert_eq!(
      decision.operation,
      Some(SchemaChange::DropTable {
        table: "orders".to_string()
      })
    );

    let decision = decide(
      rows,
      "ALTER TABLE orders ADD COLUMN user_id INTEGER REFERENCES users(id)",
    );
    assert!(decision.allowed && decision.is_ddl);
    assert_eq!(
      decision.operation,
      Some(SchemaChange::AddColumn {
        table: "orders".to_string(),
        column: "user_id".to_string(),
        db_type: DbType::Integer,
        foreign_key: Some(ForeignKeyRef {
          table: "users".to_string(),
          column: "id".to_string(),
          on_update: None,
          on_delete: None,
        }),
      })
    );

    let decision = decide(rows, "ALTER TABLE orders RENAME TO purchases");
    assert!(decision.allowed && decision.is_ddl);
    assert_eq!(
      decision.operation,
      Some(SchemaChange::RenameTable {
        table: "orders".to_string(),
        new_name: "purchases".to_string(),
      })
    );

    let decision = decide(rows, "ALTER TABLE orders RENAME COLUMN state TO status");
    assert!(decision.allowed && decision.is_ddl);

    let decision = decide(rows, "ALTER TABLE orders DROP COLUMN state");
    assert!(decision.allowed && decision.is_ddl);
    assert_eq!(
      decision.operation,
      Some(SchemaChange::DropColumn {
        table: "orders".to_string(),
        column: "state".to_string(),
      })
    );
  }

  #[test]
  fn test_ddl_denials() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:orders", "datastore.table.schema.change"),
    ];

    // schema.change alone: add column is fine, the rest need their
    // dedicated grants.
    assert!(allowed(rows, "ALTER TABLE orders ADD COLUMN note TEXT"));
    assert!(!allowed(rows, "ALTER TABLE orders RENAME TO purchases"));
    assert!(!allowed(rows, "ALTER TABLE orders DROP COLUMN state"));
    assert!(!allowed(rows, "ALTER TABLE orders RENAME COLUMN state TO s"));
    assert!(!allowed(rows, "CREATE TABLE notes (x TEXT)"));
    assert!(!allowed(rows, "DROP TABLE orders"));

    // Normalization failure: constraints outside the vocabulary.
    let decision = decide(rows, "ALTER TABLE orders ADD COLUMN note TEXT NOT NULL");
    assert_eq!(decision, StatementDecision::denied());
  }

  #[test]
  fn test_unsupported_statements_denied() {
    let rows: &[(&str, &str)] = &[
      ("datastore:*.table:*", "datastore.table.row.select"),
      ("datastore:*.table:*.column:*", "datastore.table.column.select"),
    ];

    for sql in [
      "PRAGMA user_version",
      "BEGIN",
      "CREATE INDEX idx ON users (name)",
      "CREATE VIEW v AS SELECT 1",
      "ATTACH DATABASE 'x' AS y",
      "VACUUM",
    ] {
      assert!(!allowed(rows, sql), "{sql}");
    }

    assert_eq!(
      authorize_sql(&index(rows), "D", "SELECT FROM WHERE"),
      vec![StatementDecision::denied()]
    );
  }

  #[test]
  fn test_multiple_statements_decided_in_order() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:users.column:id", "datastore.table.column.select"),
    ];

    let decisions = authorize_sql(
      &index(rows),
      "D",
      "SELECT id FROM users; SELECT id FROM posts; SELECT id FROM users",
    );
    assert_eq!(
      decisions.iter().map(|d| d.allowed).collect::<Vec<_>>(),
      vec![true, false, true]
    );
  }

  #[test]
  fn test_authorizer_is_pure() {
    let rows: &[(&str, &str)] = &[
      ("datastore:D.table:users", "datastore.table.row.select"),
      ("datastore:D.table:users.column:*", "datastore.table.column.select"),
    ];
    let idx = index(rows);

    let sql = "SELECT * FROM users WHERE id IN (SELECT id FROM users)";
    assert_eq!(
      authorize_sql(&idx, "D", sql),
      authorize_sql(&idx, "D", sql)
    );
  }
}
