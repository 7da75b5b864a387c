use itertools::Itertools;
use log::*;

use crate::filter::{Filter, parse_filter};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
  Ascending,
  Descending,
}

impl Direction {
  #[inline]
  pub fn as_sql(&self) -> &'static str {
    return match self {
      Self::Ascending => "ASC",
      Self::Descending => "DESC",
    };
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
  pub column: String,
  pub direction: Direction,
}

/// Typed projection of a CRUD query string.
///
/// Parsing never fails: unknown keys, unknown operators and out-of-range
/// paging values are dropped. Validation against the schema happens at
/// query-build time where the column whitelist is known.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
  pub filters: Vec<Filter>,
  /// Explicit projection. `None` means `*`.
  pub select: Option<Vec<String>>,
  pub order: Vec<Sort>,
  pub limit: Option<u64>,
  pub offset: Option<u64>,
}

/// Keys that are never filter candidates. Logical operator keys parse as
/// reserved but are ignored for now; extending them is an interface
/// version bump.
fn is_reserved_key(key: &str) -> bool {
  return matches!(key, "select" | "order" | "limit" | "offset" | "or" | "and")
    || key.starts_with("or(")
    || key.starts_with("and(")
    || key.starts_with("not.");
}

impl Query {
  /// Parse a raw (still percent-encoded) URL query string.
  pub fn parse(query: &str) -> Query {
    return Self::from_pairs(
      form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
    );
  }

  /// Parse decoded key/value pairs. Repeated filter keys yield one filter
  /// each; repeated scalar keys are last-wins.
  pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Query {
    let mut query = Query::default();

    for (key, value) in pairs {
      match key.as_str() {
        "select" => query.select = Some(parse_select(&value)),
        "order" => query.order = parse_order(&value),
        "limit" => {
          // Zero or negative page sizes are dropped, defaults apply downstream.
          match value.parse::<u64>() {
            Ok(limit) if limit > 0 => query.limit = Some(limit),
            _ => debug!("dropping invalid limit: {value}"),
          }
        }
        "offset" => match value.parse::<u64>() {
          Ok(offset) => query.offset = Some(offset),
          _ => debug!("dropping invalid offset: {value}"),
        },
        _ if is_reserved_key(&key) => {}
        _ => {
          if let Some(filter) = parse_filter(&key, &value) {
            query.filters.push(filter);
          }
        }
      }
    }

    return query;
  }
}

/// Comma-split projection items. `alias:column` yields the column with the
/// alias discarded; casts (`::`) and JSON paths (`->`, `->>`) pass through
/// verbatim.
fn parse_select(value: &str) -> Vec<String> {
  return value
    .split(',')
    .map(|item| item.trim())
    .filter(|item| !item.is_empty())
    .map(|item| {
      if item.contains("::") || item.contains("->") {
        return item.to_string();
      }

      return match item.split_once(':') {
        Some((alias, column)) if !alias.is_empty() && !column.is_empty() => column.to_string(),
        _ => item.to_string(),
      };
    })
    .collect();
}

/// `col[.asc|.desc[.nullsfirst|.nullslast]]` per comma-separated item.
/// Null-ordering modifiers are accepted syntactically and ignored.
fn parse_order(value: &str) -> Vec<Sort> {
  return value
    .split(',')
    .map(|item| item.trim())
    .filter(|item| !item.is_empty())
    .filter_map(|item| {
      let mut parts = item.split('.');
      let column = parts.next()?.to_string();
      if column.is_empty() {
        return None;
      }

      let direction = match parts.next() {
        None => Direction::Ascending,
        Some("asc") => Direction::Ascending,
        Some("desc") => Direction::Descending,
        Some(modifier) => {
          debug!("dropping order item with unknown modifier: {modifier}");
          return None;
        }
      };

      match parts.next() {
        None | Some("nullsfirst") | Some("nullslast") => {}
        Some(modifier) => {
          debug!("dropping order item with unknown null ordering: {modifier}");
          return None;
        }
      }

      return Some(Sort { column, direction });
    })
    .collect_vec();
}
