/// Permission target grammar.
///
/// Serialized targets are 1–3 dot-separated `prefix:value` segments with
/// the fixed prefix order `datastore`, `table`, `column`, e.g.
/// `datastore:D.table:users.column:email`. Any value may be the literal
/// `*`. The root of the permission tree serializes as the bare `*`.
///
/// Parsing is tolerant: permissions come out of a relational store and a
/// single malformed row must be skipped rather than abort the whole set.
/// The flip side is strictness about what does parse: for every accepted
/// `s`, `parse_target(s).serialize() == s`.

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
  /// The literal `*`: any node at this level.
  Any,
  Named(String),
}

impl Segment {
  fn parse(value: &str) -> Option<Segment> {
    return match value {
      "" => None,
      "*" => Some(Segment::Any),
      _ => Some(Segment::Named(value.to_string())),
    };
  }

  pub fn as_str(&self) -> &str {
    return match self {
      Self::Any => "*",
      Self::Named(name) => name,
    };
  }

  /// The concrete name, if this segment isn't a wildcard.
  pub fn name(&self) -> Option<&str> {
    return match self {
      Self::Any => None,
      Self::Named(name) => Some(name),
    };
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
  Global,
  Datastore(Segment),
  Table(Segment, Segment),
  Column(Segment, Segment, Segment),
}

/// Parse a serialized target. Returns `None` for anything that isn't
/// exactly the grammar above; callers drop such rows so malformed
/// permissions can never widen access.
pub fn parse_target(s: &str) -> Option<Target> {
  if s == "*" {
    return Some(Target::Global);
  }

  let mut segments = s.split('.');

  let datastore = prefixed(segments.next()?, "datastore")?;
  let Some(table) = segments.next() else {
    return Some(Target::Datastore(datastore));
  };
  let table = prefixed(table, "table")?;
  let Some(column) = segments.next() else {
    return Some(Target::Table(datastore, table));
  };
  let column = prefixed(column, "column")?;

  if segments.next().is_some() {
    return None;
  }
  return Some(Target::Column(datastore, table, column));
}

fn prefixed(segment: &str, prefix: &str) -> Option<Segment> {
  let (p, value) = segment.split_once(':')?;
  if p != prefix {
    return None;
  }
  return Segment::parse(value);
}

impl Target {
  pub fn serialize(&self) -> String {
    return match self {
      Self::Global => "*".to_string(),
      Self::Datastore(d) => format!("datastore:{}", d.as_str()),
      Self::Table(d, t) => format!("datastore:{}.table:{}", d.as_str(), t.as_str()),
      Self::Column(d, t, c) => format!(
        "datastore:{}.table:{}.column:{}",
        d.as_str(),
        t.as_str(),
        c.as_str()
      ),
    };
  }
}
