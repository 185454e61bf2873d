//! Provider-level configuration.
//!
//! Settings come from the declared provider configuration first and fall back
//! to environment variables. The API token never leaves a [`SecretString`].

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::schema::{Attribute, Schema, Validator};

/// Base URL used when neither configuration nor environment sets one.
pub const DEFAULT_BASE_URL: &str = "https://api.axiom.co";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "AXIOM_TOKEN";

/// Environment variable overriding the base URL.
pub const URL_ENV: &str = "AXIOM_URL";

/// Environment variable holding the organisation id.
pub const ORG_ID_ENV: &str = "AXIOM_ORG_ID";

/// Accepted token prefixes: advanced API tokens and personal tokens.
pub const TOKEN_PREFIXES: [&str; 2] = ["xaat-", "xapt-"];

/// Errors raised while resolving provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has an unacceptable value.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// No token was declared or found in the environment.
    #[error("no API token configured: set api_token or {TOKEN_ENV}")]
    MissingToken,

    /// The base URL does not parse.
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configuration object has the wrong shape.
    #[error("invalid provider configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclaredConfig {
    api_token: Option<String>,
    base_url: Option<String>,
    org_id: Option<String>,
}

/// Resolved settings used to build the API client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Bearer token.
    pub api_token: SecretString,
    /// API root, e.g. `https://api.axiom.co`.
    pub base_url: Url,
    /// Organisation id, required for personal tokens.
    pub org_id: Option<String>,
}

impl ProviderConfig {
    /// Resolve from declared configuration and the process environment.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        Self::resolve(value, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// Declared values win; empty strings count as unset.
    pub fn resolve<F>(value: &Value, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let declared: DeclaredConfig = if value.is_null() {
            DeclaredConfig::default()
        } else {
            serde_json::from_value(value.clone())?
        };

        let pick = |declared: Option<String>, var: &str| {
            non_empty(declared).or_else(|| non_empty(env(var)))
        };

        let token = pick(declared.api_token, TOKEN_ENV).ok_or(ConfigError::MissingToken)?;
        validate_token(&token)?;

        let base_url = match pick(declared.base_url, URL_ENV) {
            Some(raw) => Url::parse(&raw)?,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Validation {
                field: "base_url".into(),
                reason: format!("'{base_url}' cannot be used as an API root"),
            });
        }

        Ok(Self {
            api_token: SecretString::from(token),
            base_url,
            org_id: pick(declared.org_id, ORG_ID_ENV),
        })
    }

    /// Whether the token is a personal token, which needs an org id.
    pub fn is_personal_token(&self) -> bool {
        self.api_token.expose_secret().starts_with("xapt-")
    }
}

/// Check the documented token prefix format.
pub fn validate_token(token: &str) -> Result<(), ConfigError> {
    if TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: "api_token".into(),
            reason: format!("must start with one of {}", TOKEN_PREFIXES.join(", ")),
        })
    }
}

/// Schema of the provider configuration block.
pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "api_token",
            Attribute::optional_string()
                .sensitive()
                .with_validator(Validator::matches(
                    "^(xaat|xapt)-",
                    "API token must start with xaat- or xapt-",
                ))
                .with_description(format!("Axiom API token. Falls back to {TOKEN_ENV}.")),
        )
        .with_attribute(
            "base_url",
            Attribute::optional_string()
                .with_description(format!("Axiom API root. Falls back to {URL_ENV}.")),
        )
        .with_attribute(
            "org_id",
            Attribute::optional_string()
                .with_description(format!("Organisation id. Falls back to {ORG_ID_ENV}.")),
        )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
