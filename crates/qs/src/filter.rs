use log::*;

use crate::value::Value;

/// Comparison operators of the wire grammar: `?column=op.value`.
///
/// The operator alphabet is frozen. Extensions must keep unknown operators
/// ignored rather than errored for forward compatibility.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompareOp {
  Equal,
  NotEqual,
  GreaterThan,
  GreaterThanEqual,
  LessThan,
  LessThanEqual,
  Like,
  ILike,
  In,
  Is,
}

impl CompareOp {
  pub fn from(qualifier: &str) -> Option<Self> {
    return match qualifier {
      "eq" => Some(Self::Equal),
      "ne" => Some(Self::NotEqual),
      "gt" => Some(Self::GreaterThan),
      "gte" => Some(Self::GreaterThanEqual),
      "lt" => Some(Self::LessThan),
      "lte" => Some(Self::LessThanEqual),
      "like" => Some(Self::Like),
      "ilike" => Some(Self::ILike),
      "in" => Some(Self::In),
      "is" => Some(Self::Is),
      _ => None,
    };
  }

  /// The bare SQL operator token. `ILike`, `In` and `Is` need bespoke
  /// assembly downstream, this is only the leading keyword.
  #[inline]
  pub fn as_sql(&self) -> &'static str {
    return match self {
      Self::Equal => "=",
      Self::NotEqual => "<>",
      Self::GreaterThan => ">",
      Self::GreaterThanEqual => ">=",
      Self::LessThan => "<",
      Self::LessThanEqual => "<=",
      Self::Like => "LIKE",
      Self::ILike => "LIKE",
      Self::In => "IN",
      Self::Is => "IS",
    };
  }
}

/// Right-hand side of an `is` filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IsValue {
  Null,
  True,
  False,
  /// Three-valued SQL unknown. Rendered as `NULL` on SQLite.
  Unknown,
}

impl IsValue {
  fn from(value: &str) -> Option<Self> {
    return match value {
      "null" => Some(Self::Null),
      "true" => Some(Self::True),
      "false" => Some(Self::False),
      "unknown" => Some(Self::Unknown),
      _ => None,
    };
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
  Scalar(Value),
  /// Operand of `in`. May parse empty, rejected at query-build time.
  List(Vec<Value>),
  Is(IsValue),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
  pub column: String,
  pub op: CompareOp,
  pub value: FilterValue,
}

/// Parse one `column=op.value` pair. Unknown operators and malformed
/// operands yield `None` and are skipped by the caller: a bad filter must
/// never widen a result set, and erroring would break forward
/// compatibility with newer clients.
pub(crate) fn parse_filter(column: &str, raw: &str) -> Option<Filter> {
  let (op_str, rest) = raw.split_once('.')?;
  let op = CompareOp::from(op_str)?;

  let value = match op {
    CompareOp::In => {
      let inner = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')'));
      let Some(inner) = inner else {
        debug!("in-filter operand without parentheses: {raw}");
        return None;
      };
      FilterValue::List(split_list_elements(inner)?)
    }
    CompareOp::Is => {
      let Some(is) = IsValue::from(rest) else {
        debug!("is-filter operand must be null|true|false|unknown: {raw}");
        return None;
      };
      FilterValue::Is(is)
    }
    CompareOp::Like | CompareOp::ILike => {
      // The wire grammar uses '*' as the wildcard.
      FilterValue::Scalar(Value::String(rest.replace('*', "%")))
    }
    _ => FilterValue::Scalar(Value::unparse(rest.to_string())),
  };

  return Some(Filter {
    column: column.to_string(),
    op,
    value,
  });
}

/// Comma-split the inside of `in.(…)` respecting double-quoted segments
/// with `\"` escapes. Quoted elements stay strings, unquoted ones go
/// through scalar inference.
fn split_list_elements(inner: &str) -> Option<Vec<Value>> {
  if inner.is_empty() {
    return Some(vec![]);
  }

  let mut elements: Vec<Value> = vec![];
  let mut current = String::new();
  let mut quoted = false;
  let mut in_quotes = false;
  let mut escaped = false;

  let flush = |current: &mut String, quoted: &mut bool, elements: &mut Vec<Value>| {
    let text = std::mem::take(current);
    elements.push(if *quoted {
      Value::String(text)
    } else {
      Value::unparse(text)
    });
    *quoted = false;
  };

  for ch in inner.chars() {
    if escaped {
      current.push(ch);
      escaped = false;
      continue;
    }

    match ch {
      '\\' if in_quotes => escaped = true,
      '"' => {
        in_quotes = !in_quotes;
        quoted = true;
      }
      ',' if !in_quotes => flush(&mut current, &mut quoted, &mut elements),
      _ => current.push(ch),
    }
  }

  if in_quotes {
    debug!("unbalanced quotes in in-filter operand");
    return None;
  }
  flush(&mut current, &mut quoted, &mut elements);

  return Some(elements);
}
