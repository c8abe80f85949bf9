//! Cache name validation.

/// Separator between the cache name and the timestamp in an entry filename.
pub const FIELD_SEPARATOR: char = '.';

/// A cache name is usable as a filename prefix only if it is non-empty and made
/// of ASCII letters and digits. Anything else (the field separator, path
/// separators, whitespace) would break prefix matching or escape the root.
pub fn is_valid_name(name: &str) -> bool {
  !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_alphanumeric_names_are_valid() {
    assert!(is_valid_name("ls"));
    assert!(is_valid_name("t1"));
    assert!(is_valid_name("ABC123"));
  }

  #[test]
  fn test_empty_name_is_invalid() {
    assert!(!is_valid_name(""));
  }

  #[test]
  fn test_separator_is_rejected() {
    assert!(!is_valid_name("has.dots"));
    assert!(!is_valid_name(&format!("a{}b", FIELD_SEPARATOR)));
  }

  #[test]
  fn test_path_like_names_are_rejected() {
    assert!(!is_valid_name("../etc"));
    assert!(!is_valid_name("a/b"));
    assert!(!is_valid_name("never-written"));
    assert!(!is_valid_name("with space"));
    assert!(!is_valid_name("ünïcode"));
  }
}
