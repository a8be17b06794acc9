//! Diagnostics reported to the user instead of hard failures

use crate::path::AttributePath;
use apisix_core::Error;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Stops the current operation
    Error,
    /// Reported, but the operation continues
    Warning,
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// One line summary
    pub summary: String,
    /// Longer explanation
    pub detail: String,
    /// Attribute the diagnostic refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<AttributePath>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(f, "{severity}: {}", self.summary)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        if let Some(path) = self.path.as_ref().filter(|p| !p.is_root()) {
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Add an error not tied to an attribute
    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            path: None,
        });
    }

    /// Add a warning not tied to an attribute
    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            path: None,
        });
    }

    /// Add an error about an attribute
    pub fn add_attribute_error(
        &mut self,
        path: AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            path: Some(path),
        });
    }

    /// Add a warning about an attribute
    pub fn add_attribute_warning(
        &mut self,
        path: AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            path: Some(path),
        });
    }

    /// Record a provider error as a diagnostic
    pub fn add_from_error(&mut self, context: &str, error: &Error) {
        let detail = if context.is_empty() {
            error.to_string()
        } else {
            format!("{context}: {error}")
        };
        self.add_error(error.summary(), detail);
    }

    /// Move every diagnostic of `other` into this collection
    pub fn append(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Whether at least one error was recorded
    pub fn has_error(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of errors
    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate over diagnostics
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Iterate over errors only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl From<Error> for Diagnostics {
    fn from(error: Error) -> Self {
        let mut diags = Diagnostics::new();
        diags.add_from_error("", &error);
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_error() {
        let mut diags = Diagnostics::new();
        diags.add_warning("Unable to create client", "endpoint is empty");
        assert!(!diags.has_error());

        diags.add_error("Missing required argument", "name is required");
        assert!(diags.has_error());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_display_with_path() {
        let mut diags = Diagnostics::new();
        diags.add_attribute_error(
            AttributePath::root().attribute("uri"),
            "Invalid Attribute Combination",
            "uri conflicts with uris",
        );
        assert_eq!(
            diags.to_string(),
            "Error: Invalid Attribute Combination: uri conflicts with uris (at uri)"
        );
    }

    #[test]
    fn test_from_error() {
        let diags = Diagnostics::from(Error::NotConfigured);
        assert!(diags.has_error());
        let first = diags.iter().next().unwrap();
        assert_eq!(first.summary, "Provider not configured");
    }
}
