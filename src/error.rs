//! Error types for the Axiom provider.

use thiserror::Error;

/// Errors returned by [`ProviderService`](crate::ProviderService) dispatch.
///
/// Failures inside a lifecycle verb, remote ones included, are reported as
/// diagnostics on the response instead; these variants cover problems with
/// the call itself.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The call's payload or version was rejected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Unimplemented(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("axiom_dashboard".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: axiom_dashboard");
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Validation("state version 7 is newer".to_string());
        assert_eq!(err.message(), "state version 7 is newer");

        let err = ProviderError::Unimplemented("import".to_string());
        assert_eq!(err.message(), "import");
    }
}
