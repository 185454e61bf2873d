// HTTPS client for the Axiom REST API.
//
// Base path: /v2/
// Auth: Bearer token, optional X-Axiom-Org-Id header

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::models::{
    ApiToken, CreateTokenRequest, CreateUserRequest, CreatedToken, Dataset, DatasetCreateRequest,
    DatasetUpdateRequest, Monitor, Notifier, UpdateUserRequest, User, VirtualField,
};
use super::{ApiError, AxiomApi};
use crate::config::ProviderConfig;

const ORG_ID_HEADER: &str = "X-Axiom-Org-Id";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// ── Error response shape ─────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Axiom API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AxiomClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AxiomClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from resolved provider configuration.
    ///
    /// The bearer token and org id are installed as default headers.
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_token.expose_secret()
        ))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        if let Some(org_id) = &config.org_id {
            headers.insert(ORG_ID_HEADER, HeaderValue::from_str(org_id)?);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Self::with_client(http, config.base_url.clone())
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Result<Self, ApiError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    /// The API root requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append `v2/<segments>` to the base URL, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("v2")
            .extend(segments);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        let url = self.url(segments)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                ApiError::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), ApiError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> ApiError {
        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse { message: Some(m) }) if !m.is_empty() => m,
            _ if !raw.is_empty() => raw,
            _ => status.to_string(),
        };

        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl AxiomApi for AxiomClient {
    // ── Datasets ─────────────────────────────────────────────────────

    async fn create_dataset(&self, request: &DatasetCreateRequest) -> Result<Dataset, ApiError> {
        self.post(&["datasets"], request).await
    }

    async fn get_dataset(&self, id: &str) -> Result<Dataset, ApiError> {
        self.get(&["datasets", id]).await
    }

    async fn update_dataset(
        &self,
        id: &str,
        request: &DatasetUpdateRequest,
    ) -> Result<Dataset, ApiError> {
        self.put(&["datasets", id], request).await
    }

    async fn update_dataset_map_fields(
        &self,
        id: &str,
        fields: &[String],
    ) -> Result<Vec<String>, ApiError> {
        self.put(&["datasets", id, "mapfields"], fields).await
    }

    async fn delete_dataset(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["datasets", id]).await
    }

    // ── Monitors ─────────────────────────────────────────────────────

    async fn create_monitor(&self, monitor: &Monitor) -> Result<Monitor, ApiError> {
        self.post(&["monitors"], monitor).await
    }

    async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError> {
        self.get(&["monitors", id]).await
    }

    async fn update_monitor(&self, id: &str, monitor: &Monitor) -> Result<Monitor, ApiError> {
        self.put(&["monitors", id], monitor).await
    }

    async fn delete_monitor(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["monitors", id]).await
    }

    // ── Notifiers ────────────────────────────────────────────────────

    async fn create_notifier(&self, notifier: &Notifier) -> Result<Notifier, ApiError> {
        self.post(&["notifiers"], notifier).await
    }

    async fn get_notifier(&self, id: &str) -> Result<Notifier, ApiError> {
        self.get(&["notifiers", id]).await
    }

    async fn update_notifier(&self, id: &str, notifier: &Notifier) -> Result<Notifier, ApiError> {
        self.put(&["notifiers", id], notifier).await
    }

    async fn delete_notifier(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["notifiers", id]).await
    }

    // ── Tokens ───────────────────────────────────────────────────────

    async fn create_token(&self, request: &CreateTokenRequest) -> Result<CreatedToken, ApiError> {
        self.post(&["tokens"], request).await
    }

    async fn get_token(&self, id: &str) -> Result<ApiToken, ApiError> {
        self.get(&["tokens", id]).await
    }

    async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["tokens", id]).await
    }

    // ── Users ────────────────────────────────────────────────────────

    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, ApiError> {
        self.post(&["users"], request).await
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.get(&["users", id]).await
    }

    async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> Result<User, ApiError> {
        self.put(&["users", id], request).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["users", id]).await
    }

    // ── Virtual fields ───────────────────────────────────────────────

    async fn create_virtual_field(&self, field: &VirtualField) -> Result<VirtualField, ApiError> {
        self.post(&["vfields"], field).await
    }

    async fn get_virtual_field(&self, id: &str) -> Result<VirtualField, ApiError> {
        self.get(&["vfields", id]).await
    }

    async fn update_virtual_field(
        &self,
        id: &str,
        field: &VirtualField,
    ) -> Result<VirtualField, ApiError> {
        self.put(&["vfields", id], field).await
    }

    async fn delete_virtual_field(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["vfields", id]).await
    }
}
