//! The Axiom provider: [`ProviderService`] dispatch onto the reconciler.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{AxiomApi, AxiomClient};
use crate::config::{self, ConfigError, ProviderConfig};
use crate::data_sources;
use crate::diagnostics::Diagnostics;
use crate::error::ProviderError;
use crate::resources::{Outcome, Reconciler, ResourceKind, Transition, SCHEMA_VERSION};
use crate::schema::{Diagnostic, DiagnosticCategory, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::state::PlanState;
use crate::types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ResourceResponse,
    ServerCapabilities,
};
use crate::validation::validate;

/// Provider for the Axiom resource kinds.
///
/// The API client is installed once, by [`configure`](ProviderService::configure)
/// or [`with_client`](AxiomProvider::with_client), and shared by every call
/// afterwards.
#[derive(Default)]
pub struct AxiomProvider {
    client: OnceLock<Arc<dyn AxiomApi>>,
}

impl std::fmt::Debug for AxiomProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxiomProvider")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl AxiomProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that talks to `client` and needs no `configure` call.
    pub fn with_client(client: Arc<dyn AxiomApi>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(client);
        Self { client: cell }
    }

    /// Whether a client has been installed.
    pub fn is_configured(&self) -> bool {
        self.client.get().is_some()
    }

    fn reconciler(&self) -> Reconciler {
        match self.client.get() {
            Some(client) => Reconciler::new(Arc::clone(client)),
            None => Reconciler::unconfigured(),
        }
    }
}

fn resource_kind(type_name: &str) -> Result<ResourceKind, ProviderError> {
    ResourceKind::from_str(type_name)
        .map_err(|_| ProviderError::UnknownResource(type_name.to_string()))
}

fn decode(value: Value) -> Result<PlanState, ProviderError> {
    PlanState::from_value(value)
        .map_err(|d| ProviderError::Validation(d.detail.unwrap_or(d.summary)))
}

/// Turn a reconciler outcome into the engine's view; `kept` is the state
/// tracked before the call.
fn respond(outcome: Outcome, kept: Option<Value>) -> ResourceResponse {
    let new_state = match outcome.transition {
        Transition::Persist(state) => Some(state.into_value()),
        Transition::Remove => None,
        Transition::Keep => kept,
    };
    ResourceResponse {
        new_state,
        diagnostics: outcome.diagnostics.into_vec(),
    }
}

/// JSON equality that treats `1` and `1.0` as the same number.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same_value(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, a)| y.get(k).is_some_and(|b| same_value(a, b)))
        }
        _ => a == b,
    }
}

/// Attribute-level differences between two states.
fn diff(prior: &PlanState, planned: &PlanState) -> Vec<AttributeChange> {
    let names: BTreeSet<&String> = prior
        .iter()
        .chain(planned.iter())
        .map(|(name, _)| name)
        .collect();
    names
        .into_iter()
        .filter_map(|name| match (prior.raw(name), planned.raw(name)) {
            (None, Some(after)) => Some(AttributeChange::added(name.as_str(), after.clone())),
            (Some(before), None) => Some(AttributeChange::removed(name.as_str(), before.clone())),
            (Some(before), Some(after)) if !same_value(before, after) => Some(
                AttributeChange::modified(name.as_str(), before.clone(), after.clone()),
            ),
            _ => None,
        })
        .collect()
}

/// Copy provider-assigned values the user cannot set from `prior`.
fn carry_computed(schema: &Schema, prior: &PlanState, planned: &mut PlanState) {
    for (name, attr) in &schema.block.attributes {
        if attr.flags.is_computed_only() && planned.is_null(name) {
            if let Some(value) = prior.raw(name) {
                planned.set(name.as_str(), value.clone());
            }
        }
    }
}

/// Schema and cross-field checks for a resource configuration.
fn check_config(kind: ResourceKind, config: &Value) -> Result<Diagnostics, ProviderError> {
    let mut diagnostics: Diagnostics = validate(&kind.schema(), config).into();
    if !diagnostics.has_errors() {
        let state = decode(config.clone())?;
        diagnostics.append(kind.resource().validate(&state));
    }
    Ok(diagnostics)
}

#[async_trait::async_trait]
impl ProviderService for AxiomProvider {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    fn schema(&self) -> ProviderSchema {
        ResourceKind::all().fold(
            ProviderSchema::new().with_provider_config(config::schema()),
            |schema, kind| {
                schema
                    .with_resource(kind.to_string(), kind.schema())
                    .with_data_source(kind.to_string(), data_sources::schema(kind))
            },
        )
    }

    fn metadata(&self) -> ProviderMetadata {
        let names: Vec<String> = ResourceKind::all().map(|k| k.to_string()).collect();
        ProviderMetadata {
            resources: names.clone(),
            data_sources: names,
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("ValidateProviderConfig called");
        let diagnostics = validate(&config::schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(
                diagnostics = diagnostics.len(),
                "ValidateProviderConfig completed with errors"
            );
        } else {
            info!("ValidateProviderConfig completed successfully");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Configure called");
        let mut diagnostics: Diagnostics = validate(&config::schema(), &config).into();
        if diagnostics.has_errors() {
            warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
            return Ok(diagnostics.into_vec());
        }

        let settings = match ProviderConfig::from_value(&config) {
            Ok(settings) => settings,
            Err(ConfigError::MissingToken) => {
                warn!("Configure completed with errors");
                return Ok(vec![Diagnostic::error("Token is required")
                    .with_detail(format!(
                        "Please set api_token in the provider configuration or the {} environment variable.",
                        config::TOKEN_ENV
                    ))
                    .with_attribute("api_token")
                    .with_category(DiagnosticCategory::Configuration)]);
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                return Ok(vec![Diagnostic::error("Invalid provider configuration")
                    .with_detail(e.to_string())
                    .with_category(DiagnosticCategory::Configuration)]);
            }
        };

        if settings.is_personal_token() && settings.org_id.is_none() {
            diagnostics.push(
                Diagnostic::warning("Missing organisation id")
                    .with_detail(format!(
                        "Personal tokens need org_id or {} to be set.",
                        config::ORG_ID_ENV
                    ))
                    .with_attribute("org_id")
                    .with_category(DiagnosticCategory::Configuration),
            );
        }

        let client = match AxiomClient::new(&settings) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Configure failed");
                diagnostics.push(
                    Diagnostic::error("Unable to create Axiom client")
                        .with_detail(e.to_string())
                        .with_category(DiagnosticCategory::Configuration),
                );
                return Ok(diagnostics.into_vec());
            }
        };

        if self.client.set(Arc::new(client)).is_err() {
            warn!("Configure called on an already configured provider");
            diagnostics.push(
                Diagnostic::error("Provider already configured")
                    .with_detail("The API client can only be configured once.")
                    .with_category(DiagnosticCategory::Configuration),
            );
            return Ok(diagnostics.into_vec());
        }

        info!(base_url = %settings.base_url, "Configure completed successfully");
        Ok(diagnostics.into_vec())
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stop called");
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = resource_kind(resource_type)?;
        let diagnostics = check_config(kind, &config)?;
        if diagnostics.has_errors() {
            warn!(resource_type = %kind, diagnostics = diagnostics.len(), "ValidateResourceConfig completed with errors");
        } else {
            info!(resource_type = %kind, "ValidateResourceConfig completed successfully");
        }
        Ok(diagnostics.into_vec())
    }

    #[instrument(skip(self, state), name = "provider.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = resource_kind(resource_type)?;
        match u64::try_from(version) {
            Ok(v) if v <= SCHEMA_VERSION => {
                info!(resource_type = %kind, from_version = version, "UpgradeResourceState completed");
                Ok(state)
            }
            _ => {
                error!(resource_type = %kind, version, "UpgradeResourceState failed");
                Err(ProviderError::Validation(format!(
                    "state version {} of {} is not supported (current version is {})",
                    version, kind, SCHEMA_VERSION
                )))
            }
        }
    }

    #[instrument(skip(self, prior_state, proposed_state, config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let kind = resource_kind(resource_type)?;
        let schema = kind.schema();
        let prior = match prior_state {
            Some(value) if !value.is_null() => Some(decode(value)?),
            _ => None,
        };
        debug!(resource_type = %kind, is_create = prior.is_none(), "Plan called");

        if proposed_state.is_null() {
            let prior = prior.unwrap_or_default();
            let changes = diff(&prior, &PlanState::new());
            info!(resource_type = %kind, changes = changes.len(), "Plan completed (destroy)");
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let prior_value = prior.clone().map(PlanState::into_value).unwrap_or(Value::Null);
        let checked = if config.is_null() { &proposed_state } else { &config };
        let diagnostics = check_config(kind, checked)?;
        if diagnostics.has_errors() {
            warn!(resource_type = %kind, diagnostics = diagnostics.len(), "Plan completed with errors");
            return Ok(PlanResult::failed(prior_value, diagnostics));
        }

        let mut planned = decode(proposed_state)?;
        planned.apply_defaults(&schema);

        let Some(prior) = prior else {
            let changes = diff(&PlanState::new(), &planned);
            info!(resource_type = %kind, changes = changes.len(), "Plan completed");
            return Ok(PlanResult::with_changes(planned.into_value(), changes, false));
        };

        let force_new = schema.force_new_paths();
        let requires_replace = diff(&prior, &planned)
            .iter()
            .any(|c| force_new.contains(&c.path.as_str()));
        if !requires_replace {
            carry_computed(&schema, &prior, &mut planned);
        }
        let changes = diff(&prior, &planned);

        info!(
            resource_type = %kind,
            changes = changes.len(),
            requires_replace,
            "Plan completed"
        );
        Ok(PlanResult {
            diagnostics: diagnostics.into_vec(),
            ..PlanResult::with_changes(planned.into_value(), changes, requires_replace)
        })
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        let kind = resource_kind(resource_type)?;
        let plan = decode(planned_state)?;
        let outcome = self.reconciler().create(kind.resource(), &plan).await;
        Ok(respond(outcome, None))
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        let kind = resource_kind(resource_type)?;
        let state = decode(current_state.clone())?;
        let outcome = self.reconciler().read(kind.resource(), &state).await;
        Ok(respond(outcome, Some(current_state)))
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        let kind = resource_kind(resource_type)?;
        let prior = decode(prior_state.clone())?;
        let plan = decode(planned_state)?;
        let outcome = self.reconciler().update(kind.resource(), &prior, &plan).await;
        Ok(respond(outcome, Some(prior_state)))
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        let kind = resource_kind(resource_type)?;
        let state = decode(current_state.clone())?;
        let outcome = self.reconciler().delete(kind.resource(), &state).await;
        Ok(respond(outcome, Some(current_state)))
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let kind = resource_kind(resource_type)?;
        if id.is_empty() {
            return Err(ProviderError::Validation(
                "import id must not be empty".to_string(),
            ));
        }
        info!(resource_type = %kind, id, "ImportResourceState completed");
        Ok(vec![ImportedResource::new(
            kind.to_string(),
            PlanState::new().with("id", id).into_value(),
        )])
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    #[instrument(skip(self, config), name = "provider.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = resource_kind(data_source_type)?;
        Ok(validate(&data_sources::schema(kind), &config))
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        let kind = resource_kind(data_source_type)?;
        let config = decode(config)?;
        match data_sources::read(&self.reconciler(), kind, &config).await {
            Ok(state) => Ok(ResourceResponse::state(state.into_value())),
            Err(diagnostics) => {
                warn!(data_source = %kind, diagnostics = diagnostics.len(), "ReadDataSource completed with errors");
                Ok(ResourceResponse::gone().with_diagnostics(diagnostics))
            }
        }
    }
}
