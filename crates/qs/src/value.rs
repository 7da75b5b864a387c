use std::str::FromStr;

/// Scalar inferred from a query-string fragment.
///
/// Inference order is fixed: integer, double, bool, null, otherwise the
/// verbatim string. Quoted `in`-list elements bypass inference entirely.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  String(String),
  Integer(i64),
  Double(f64),
  Bool(bool),
  Null,
}

impl Value {
  pub(crate) fn unparse(value: String) -> Self {
    if let Ok(i) = i64::from_str(&value) {
      return Value::Integer(i);
    }
    if let Ok(d) = f64::from_str(&value) {
      return Value::Double(d);
    }

    return match value.as_str() {
      "true" => Value::Bool(true),
      "false" => Value::Bool(false),
      "null" => Value::Null,
      _ => Value::String(value),
    };
  }
}

impl std::fmt::Display for Value {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    return match self {
      Self::String(s) => s.fmt(f),
      Self::Integer(i) => i.fmt(f),
      Self::Double(d) => d.fmt(f),
      Self::Bool(b) => b.fmt(f),
      Self::Null => "null".fmt(f),
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_value_inference() {
    assert_eq!(Value::unparse("0".to_string()), Value::Integer(0));
    assert_eq!(Value::unparse("-17".to_string()), Value::Integer(-17));
    assert_eq!(Value::unparse("0.5".to_string()), Value::Double(0.5));
    assert_eq!(Value::unparse("true".to_string()), Value::Bool(true));
    assert_eq!(Value::unparse("false".to_string()), Value::Bool(false));
    assert_eq!(Value::unparse("null".to_string()), Value::Null);
    assert_eq!(
      Value::unparse("active".to_string()),
      Value::String("active".to_string())
    );

    // Numeric-looking strings win over bool/null keywords.
    assert_eq!(Value::unparse("1".to_string()), Value::Integer(1));
  }
}
