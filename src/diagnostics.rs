//! Ordered diagnostic collections and the failure taxonomy.
//!
//! Every lifecycle step reports through [`Diagnostics`] rather than panicking or
//! returning opaque errors. A collection holding any error-severity entry means
//! the operation must not write state.

use std::fmt;
use std::ops::Deref;

use crate::client::ApiError;
use crate::schema::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};

/// An ordered sequence of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append every diagnostic from `other`, keeping order.
    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Whether any entry has error severity.
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Iterate over error-severity entries.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    /// Iterate over warning-severity entries.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Warning))
    }

    /// `Ok(())` when there are no errors, otherwise the whole collection.
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }

    /// Unwrap into the underlying vector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl Deref for Diagnostics {
    type Target = [Diagnostic];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }
}

impl From<Diagnostics> for Vec<Diagnostic> {
    fn from(diagnostics: Diagnostics) -> Self {
        diagnostics.0
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", diag.summary)?;
            if let Some(detail) = &diag.detail {
                write!(f, ": {}", detail)?;
            }
        }
        Ok(())
    }
}

/// A schema or cross-field rule was violated.
pub fn validation_error(summary: impl Into<String>, detail: impl Into<String>) -> Diagnostic {
    Diagnostic::error(summary)
        .with_detail(detail)
        .with_category(DiagnosticCategory::Validation)
}

/// A value could not be coerced to its declared type.
pub fn conversion_error(
    attribute: impl Into<String>,
    detail: impl fmt::Display,
) -> Diagnostic {
    let attribute = attribute.into();
    Diagnostic::error(format!("Invalid value for attribute '{}'", attribute))
        .with_detail(detail.to_string())
        .with_attribute(attribute)
        .with_category(DiagnosticCategory::Conversion)
}

/// The provider has no configured client.
pub fn client_not_configured() -> Diagnostic {
    Diagnostic::error("Client Error")
        .with_detail("Client is not set")
        .with_category(DiagnosticCategory::Configuration)
}

/// A remote call failed; the API error text is kept verbatim in the detail.
pub fn remote_error(summary: impl Into<String>, err: &ApiError) -> Diagnostic {
    let category = if err.is_not_found() {
        DiagnosticCategory::RemoteNotFound
    } else {
        DiagnosticCategory::Remote
    };
    Diagnostic::error(summary)
        .with_detail(err.to_string())
        .with_category(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());

        diags.push(Diagnostic::warning("Dataset Not Found"));
        assert!(!diags.has_errors());
        assert_eq!(diags.warnings().count(), 1);

        diags.push(validation_error("Invalid monitor type", "Got: Foo"));
        assert!(diags.has_errors());
        assert_eq!(diags.errors().count(), 1);
        assert!(diags.clone().into_result().is_err());
    }

    #[test]
    fn test_append_keeps_order() {
        let mut first = Diagnostics::from(Diagnostic::warning("first"));
        first.append(Diagnostics::from(vec![
            Diagnostic::error("second"),
            Diagnostic::error("third"),
        ]));

        let summaries: Vec<_> = first.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remote_error_keeps_message() {
        let err = ApiError::Api {
            status: 500,
            message: "internal failure".to_string(),
        };
        let diag = remote_error("Unable to read dataset", &err);
        assert_eq!(diag.category, Some(DiagnosticCategory::Remote));
        assert!(diag.detail.unwrap().contains("internal failure"));

        let not_found = ApiError::Api {
            status: 404,
            message: "gone".to_string(),
        };
        let diag = remote_error("Failed to delete dataset", &not_found);
        assert_eq!(diag.category, Some(DiagnosticCategory::RemoteNotFound));
    }

    #[test]
    fn test_conversion_error_points_at_attribute() {
        let diag = conversion_error("notifier_ids.0", "invalid type: integer `3`");
        assert_eq!(diag.attribute.as_deref(), Some("notifier_ids.0"));
        assert_eq!(diag.category, Some(DiagnosticCategory::Conversion));
    }

    #[test]
    fn test_display_joins_entries() {
        let diags = Diagnostics::from(vec![
            client_not_configured(),
            Diagnostic::error("Update not supported"),
        ]);
        assert_eq!(
            diags.to_string(),
            "Client Error: Client is not set; Update not supported"
        );
    }
}
