//! Remote client adapter for the Axiom API.
//!
//! The reconciler only sees the [`AxiomApi`] trait. [`AxiomClient`] implements
//! it over HTTPS; tests substitute an in-memory fake.

mod error;
mod http;
#[allow(missing_docs)]
pub mod models;

use async_trait::async_trait;

pub use error::ApiError;
pub use http::AxiomClient;

use models::{
    ApiToken, CreateTokenRequest, CreateUserRequest, CreatedToken, Dataset, DatasetCreateRequest,
    DatasetUpdateRequest, Monitor, Notifier, UpdateUserRequest, User, VirtualField,
};

/// Create/read/update/delete calls per resource kind.
///
/// Implementations must be safe for concurrent use across different resource
/// instances. Not-found responses are reported as errors for which
/// [`ApiError::is_not_found`] returns `true`. Dropping a returned future
/// abandons the request.
#[async_trait]
pub trait AxiomApi: Send + Sync {
    /// Create a dataset.
    async fn create_dataset(&self, request: &DatasetCreateRequest) -> Result<Dataset, ApiError>;
    /// Fetch a dataset by id.
    async fn get_dataset(&self, id: &str) -> Result<Dataset, ApiError>;
    /// Update a dataset's mutable settings.
    async fn update_dataset(
        &self,
        id: &str,
        request: &DatasetUpdateRequest,
    ) -> Result<Dataset, ApiError>;
    /// Replace the list of fields a dataset stores as maps.
    async fn update_dataset_map_fields(
        &self,
        id: &str,
        fields: &[String],
    ) -> Result<Vec<String>, ApiError>;
    /// Delete a dataset.
    async fn delete_dataset(&self, id: &str) -> Result<(), ApiError>;

    /// Create a monitor.
    async fn create_monitor(&self, monitor: &Monitor) -> Result<Monitor, ApiError>;
    /// Fetch a monitor by id.
    async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError>;
    /// Replace a monitor.
    async fn update_monitor(&self, id: &str, monitor: &Monitor) -> Result<Monitor, ApiError>;
    /// Delete a monitor.
    async fn delete_monitor(&self, id: &str) -> Result<(), ApiError>;

    /// Create a notifier.
    async fn create_notifier(&self, notifier: &Notifier) -> Result<Notifier, ApiError>;
    /// Fetch a notifier by id.
    async fn get_notifier(&self, id: &str) -> Result<Notifier, ApiError>;
    /// Replace a notifier.
    async fn update_notifier(&self, id: &str, notifier: &Notifier) -> Result<Notifier, ApiError>;
    /// Delete a notifier.
    async fn delete_notifier(&self, id: &str) -> Result<(), ApiError>;

    /// Create an API token. The response is the only place the secret appears.
    async fn create_token(&self, request: &CreateTokenRequest) -> Result<CreatedToken, ApiError>;
    /// Fetch token metadata by id.
    async fn get_token(&self, id: &str) -> Result<ApiToken, ApiError>;
    /// Revoke an API token.
    async fn delete_token(&self, id: &str) -> Result<(), ApiError>;

    /// Invite a user.
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, ApiError>;
    /// Fetch a user by id.
    async fn get_user(&self, id: &str) -> Result<User, ApiError>;
    /// Rename a user.
    async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> Result<User, ApiError>;
    /// Remove a user.
    async fn delete_user(&self, id: &str) -> Result<(), ApiError>;

    /// Create a virtual field.
    async fn create_virtual_field(&self, field: &VirtualField) -> Result<VirtualField, ApiError>;
    /// Fetch a virtual field by id.
    async fn get_virtual_field(&self, id: &str) -> Result<VirtualField, ApiError>;
    /// Replace a virtual field.
    async fn update_virtual_field(
        &self,
        id: &str,
        field: &VirtualField,
    ) -> Result<VirtualField, ApiError>;
    /// Delete a virtual field.
    async fn delete_virtual_field(&self, id: &str) -> Result<(), ApiError>;
}
