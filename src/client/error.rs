use thiserror::Error;

/// Errors raised by the Axiom API client.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot have path segments appended (e.g. `mailto:`).
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// A credential could not be encoded as a header value.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success status returned by the API.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status text.
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization {
        /// Parser error with a body preview.
        message: String,
        /// The full response body.
        body: String,
    },
}

impl ApiError {
    /// Returns `true` if the API reported the entity as missing (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = ApiError::Api {
            status: 404,
            message: "monitor not found".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let err = ApiError::Api {
            status: 410,
            message: "not found".to_string(),
        };
        assert!(!err.is_not_found());

        let err = ApiError::InvalidBaseUrl("mailto:ops@example.com".to_string());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_display_keeps_message() {
        let err = ApiError::Api {
            status: 422,
            message: "retentionDays must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error (HTTP 422): retentionDays must be positive"
        );
    }
}
