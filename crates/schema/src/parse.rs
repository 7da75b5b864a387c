use fallible_iterator::FallibleIterator;
use log::*;
use sqlite3_parser::ast::{Cmd, Stmt};
use sqlite3_parser::lexer::sql::{Error as Sqlite3Error, Parser};

/// Parse a SQL script into its statements, in order. EXPLAIN wrappers are
/// dropped since the engine never authorizes or executes them.
pub fn parse_into_statements(sql: &str) -> Result<Vec<Stmt>, Sqlite3Error> {
  // sqlite3_parser still panics on some malformed inputs; trap them so a
  // hostile statement cannot take the process down.
  let outer_result = std::panic::catch_unwind(|| {
    let mut parser = Parser::new(sql.as_bytes());

    let mut statements: Vec<Stmt> = vec![];
    while let Some(cmd) = parser.next()? {
      match cmd {
        Cmd::Stmt(stmt) => {
          statements.push(stmt);
        }
        Cmd::Explain(_) | Cmd::ExplainQueryPlan(_) => {}
      }
    }
    return Ok(statements);
  });

  return match outer_result {
    Ok(inner_result) => inner_result,
    Err(_panic_err) => {
      error!("SQL parser panicked");
      return Err(Sqlite3Error::UnrecognizedToken(None));
    }
  };
}

/// First statement of `sql`, if any.
pub fn parse_into_statement(sql: &str) -> Result<Option<Stmt>, Sqlite3Error> {
  let mut statements = parse_into_statements(sql)?;
  if statements.is_empty() {
    return Ok(None);
  }
  return Ok(Some(statements.remove(0)));
}
