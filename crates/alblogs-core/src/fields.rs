//! Ordered access-log field names.
//!
//! The list is produced offline from the AWS documentation and bundled with
//! the crate. Order matters: it is both the positional layout of a log record
//! and the column order of the `logs` table.

use std::collections::HashSet;

use crate::error::SchemaError;

const BUNDLED_FIELDS: &str = include_str!("../fields.txt");

/// An ordered list of unique field names, each a safe SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    names: Vec<String>,
}

impl FieldSchema {
    /// Validate and wrap a list of field names.
    pub fn new<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !is_safe_identifier(name) {
                return Err(SchemaError::InvalidIdentifier(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Parse a newline-separated field list.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when every one of `wanted` is present.
    pub fn contains_all(&self, wanted: &[&str]) -> bool {
        wanted.iter().all(|w| self.names.iter().any(|n| n == w))
    }
}

/// The field list bundled at build time.
pub fn default_fields() -> Result<FieldSchema, SchemaError> {
    FieldSchema::parse(BUNDLED_FIELDS)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_fields_are_valid() {
        let fields = default_fields().unwrap();
        assert_eq!(fields.names()[0], "type");
        assert!(fields.contains_all(&["request_creation_time", "trace_id"]));
        assert!(fields.contains_all(&["client_port", "target_port_list"]));
    }

    #[test]
    fn test_parse_skips_blank_lines_and_trims() {
        let fields = FieldSchema::parse("\n a \nb\n\n c\n").unwrap();
        assert_eq!(fields.names(), &["a", "b", "c"]);
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = FieldSchema::new(["a", "b", "a"]).unwrap_err();
        assert_eq!(err, SchemaError::Duplicate("a".to_string()));
    }

    #[test]
    fn test_rejects_empty_list() {
        assert_eq!(FieldSchema::parse("  \n").unwrap_err(), SchemaError::Empty);
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        for bad in ["client:port", "1st", "a b", "x\"y", "drop;table", ""] {
            let err = FieldSchema::new(["ok", bad]).unwrap_err();
            assert_eq!(err, SchemaError::InvalidIdentifier(bad.to_string()));
        }
    }

    #[test]
    fn test_contains_all() {
        let fields = FieldSchema::new(["a", "b"]).unwrap();
        assert!(fields.contains_all(&["b", "a"]));
        assert!(!fields.contains_all(&["a", "c"]));
        assert!(fields.contains_all(&[]));
    }
}
