/// `Content-Range` header values for CRUD responses. Formatted here so
/// the HTTP layer stays format-agnostic; the shapes are wire-frozen.

/// `"{offset}-{offset+count-1}/*"`, or `"0-0/0"` for an empty page.
pub fn select_content_range(offset: u64, count: u64) -> String {
  if count == 0 {
    return "0-0/0".to_string();
  }
  return format!("{offset}-{}/*", offset + count - 1);
}

/// `"*/{count}"`.
pub fn insert_content_range(count: u64) -> String {
  return format!("*/{count}");
}

/// `"0-{count-1}/{count}"`, or `"0-0/0"` when nothing was touched.
pub fn mutation_content_range(count: u64) -> String {
  if count == 0 {
    return "0-0/0".to_string();
  }
  return format!("0-{}/{count}", count - 1);
}
