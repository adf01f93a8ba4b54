use serde::Serialize;

use crate::path::Location;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single user-facing validation failure.
///
/// `location` is the root for failures that concern the configuration as a
/// whole rather than one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(location: Location, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(
        location: Location,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Returns true if this diagnostic is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns true if this diagnostic is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if !self.location.is_root() {
            write!(f, " (at {})", self.location)?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// An append-only, ordered collection of diagnostics.
///
/// Entries are never deduplicated or reordered: the output order is the
/// order in which checks ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for diagnostic in &self.0 {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_is_error() {
        let error = Diagnostic::error(Location::attribute("test"), "Summary", "detail");
        assert!(error.is_error());
        assert!(!error.is_warning());
    }

    #[test]
    fn test_diagnostic_is_warning() {
        let warning = Diagnostic::warning(Location::root(), "Summary", "detail");
        assert!(warning.is_warning());
        assert!(!warning.is_error());
    }

    #[test]
    fn test_sink_keeps_duplicates_in_order() {
        let mut diagnostics = Diagnostics::new();
        let first = Diagnostic::error(Location::attribute("b"), "Same", "same");
        diagnostics.push(first.clone());
        diagnostics.push(Diagnostic::warning(Location::attribute("a"), "Other", "other"));
        diagnostics.push(first.clone());

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.as_slice()[0], first);
        assert_eq!(diagnostics.as_slice()[2], first);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_display() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::error(
            Location::attribute("test1"),
            "Invalid Attribute Combination",
            "These attributes must be configured together: [test1,test2]",
        ));
        diagnostics.push(Diagnostic::error(
            Location::root(),
            "Missing Attribute Configuration",
            "At least one of these attributes must be configured: [a,b]",
        ));

        insta::assert_snapshot!(diagnostics.to_string(), @r"
        Error: Invalid Attribute Combination (at test1): These attributes must be configured together: [test1,test2]
        Error: Missing Attribute Configuration: At least one of these attributes must be configured: [a,b]
        ");
    }

    #[test]
    fn test_serialize() {
        let diagnostic = Diagnostic::error(
            Location::attribute("rule").at_index(0),
            "Invalid Attribute Value",
            "detail",
        );
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "severity": "error",
                "location": "rule[0]",
                "summary": "Invalid Attribute Value",
                "detail": "detail",
            })
        );
    }
}
