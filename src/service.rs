//! The transport-neutral provider interface.
//!
//! An orchestrating engine drives a provider through [`ProviderService`].
//! Plans and states travel as JSON objects; per-call problems come back as
//! diagnostics on the response, while `Err` is kept for calls that cannot be
//! dispatched at all.

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ResourceResponse};

/// Trait that provider implementations implement.
///
/// # Example
///
/// ```ignore
/// use axiom_provider::{AxiomProvider, ProviderService};
/// use serde_json::json;
///
/// let provider = AxiomProvider::new();
/// provider.configure(json!({"api_token": "xaat-..."})).await?;
/// let response = provider.create("axiom_dataset", json!({"name": "logs"})).await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return the served type names. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Upgrade resource state written by an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource. A `null` proposed state plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<serde_json::Value>,
        proposed_state: serde_json::Value,
        config: serde_json::Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: serde_json::Value,
    ) -> Result<ResourceResponse, ProviderError>;

    /// Refresh the state of a resource.
    async fn read(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<ResourceResponse, ProviderError>;

    /// Update an existing resource in place.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<ResourceResponse, ProviderError>;

    /// Delete a resource.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<ResourceResponse, ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read an entity through a data source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: serde_json::Value,
    ) -> Result<ResourceResponse, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "Unknown data source type: {}",
            data_source_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::{json, Value};

    struct EchoProvider;

    #[async_trait::async_trait]
    impl ProviderService for EchoProvider {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new().with_resource(
                "echo",
                Schema::v0().with_attribute("name", Attribute::required_string()),
            )
        }

        async fn configure(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![])
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state))
        }

        async fn create(
            &self,
            _resource_type: &str,
            planned_state: Value,
        ) -> Result<ResourceResponse, ProviderError> {
            Ok(ResourceResponse::state(planned_state))
        }

        async fn read(
            &self,
            _resource_type: &str,
            current_state: Value,
        ) -> Result<ResourceResponse, ProviderError> {
            Ok(ResourceResponse::state(current_state))
        }

        async fn update(
            &self,
            _resource_type: &str,
            _prior_state: Value,
            planned_state: Value,
        ) -> Result<ResourceResponse, ProviderError> {
            Ok(ResourceResponse::state(planned_state))
        }

        async fn delete(
            &self,
            _resource_type: &str,
            _current_state: Value,
        ) -> Result<ResourceResponse, ProviderError> {
            Ok(ResourceResponse::gone())
        }
    }

    #[test]
    fn test_default_metadata_from_schema() {
        let metadata = EchoProvider.metadata();
        assert_eq!(metadata.resources, vec!["echo".to_string()]);
        assert!(metadata.data_sources.is_empty());
    }

    #[tokio::test]
    async fn test_defaults() {
        let provider = EchoProvider;
        assert!(provider
            .validate_resource_config("echo", json!({}))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            provider
                .upgrade_resource_state("echo", 0, json!({"name": "a"}))
                .await
                .unwrap(),
            json!({"name": "a"})
        );
        assert!(matches!(
            provider.import_resource("echo", "1").await,
            Err(ProviderError::Unimplemented(_))
        ));
        assert!(matches!(
            provider.read_data_source("echo", json!({})).await,
            Err(ProviderError::UnknownResource(_))
        ));
    }
}
