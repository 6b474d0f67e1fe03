use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

pub use crate::validators::*;

/// A single failed check: a machine-readable code plus a human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub code: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

impl ValidationError {
    pub fn new(code: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// An error attached to a field path such as `columns[1].options`.
/// The root path is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub code: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn empty() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, field: impl Into<String>, error: ValidationError) {
        self.issues.push(ValidationIssue {
            field: field.into(),
            code: error.code,
            message: error.message,
        });
    }

    pub fn push_root(&mut self, error: ValidationError) {
        self.push(String::new(), error);
    }

    /// Records the outcome of a validator against `field`.
    pub fn check(&mut self, field: impl Into<String>, outcome: Result<(), ValidationError>) {
        if let Err(e) = outcome {
            self.push(field, e);
        }
    }

    /// Merges a nested report, prefixing every path with `prefix`.
    pub fn extend_nested(&mut self, prefix: &str, other: ValidationReport) {
        for issue in other.issues {
            let field = if issue.field.is_empty() {
                prefix.to_string()
            } else if issue.field.starts_with('[') {
                format!("{prefix}{}", issue.field)
            } else {
                format!("{prefix}.{}", issue.field)
            };
            self.issues.push(ValidationIssue { field, ..issue });
        }
    }

    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues.iter().filter(move |i| i.field == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors_for(field).next().is_some()
    }

    /// Groups messages by field path, keeping first-seen order.
    pub fn into_field_map_flat(self) -> IndexMap<String, Vec<String>> {
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        for issue in self.issues {
            map.entry(issue.field).or_default().push(issue.message.into_owned());
        }
        map
    }

    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for issue in &self.issues {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            if issue.field.is_empty() {
                write!(f, "{}", issue.message)?;
            } else {
                write!(f, "{}: {}", issue.field, issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_are_prefixed() {
        let mut inner = ValidationReport::empty();
        inner.push("name", ValidationError::new("min_chars", "too short"));
        inner.push_root(ValidationError::new("empty", "empty"));

        let mut outer = ValidationReport::empty();
        outer.extend_nested("columns[0]", inner);

        let fields: Vec<_> = outer.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["columns[0].name", "columns[0]"]);
    }

    #[test]
    fn field_map_groups_messages() {
        let mut report = ValidationReport::empty();
        report.push("a", ValidationError::new("x", "one"));
        report.push("b", ValidationError::new("x", "two"));
        report.push("a", ValidationError::new("y", "three"));

        let map = report.into_field_map_flat();
        assert_eq!(map["a"], vec!["one".to_string(), "three".to_string()]);
        assert_eq!(map.get_index(1).map(|(k, _)| k.as_str()), Some("b"));
    }
}
