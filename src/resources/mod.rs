//! Resource kinds and the lifecycle reconciler.
//!
//! Each submodule pairs a schema with `extract`/`flatten` converters and an
//! implementation of [`Resource`]. The [`Reconciler`] drives those
//! implementations through create, read, update and delete, turning their
//! results into explicit state [`Transition`]s.

pub mod dataset;
pub mod monitor;
pub mod notifier;
pub mod token;
pub mod user;
pub mod virtual_field;

use std::sync::Arc;

use async_trait::async_trait;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, error, info, instrument, warn};

use crate::client::{ApiError, AxiomApi};
use crate::diagnostics::{client_not_configured, remote_error, Diagnostics};
use crate::schema::{Diagnostic, DiagnosticCategory, Schema};
use crate::state::PlanState;

/// Current version of every resource schema.
pub const SCHEMA_VERSION: u64 = 1;

/// The managed Axiom entity kinds, named by their type name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
pub enum ResourceKind {
    /// A dataset.
    #[strum(serialize = "axiom_dataset")]
    Dataset,
    /// A monitor.
    #[strum(serialize = "axiom_monitor")]
    Monitor,
    /// A notifier.
    #[strum(serialize = "axiom_notifier")]
    Notifier,
    /// An API token.
    #[strum(serialize = "axiom_token")]
    Token,
    /// An organisation member.
    #[strum(serialize = "axiom_user")]
    User,
    /// A virtual field.
    #[strum(serialize = "axiom_virtual_field")]
    VirtualField,
}

impl ResourceKind {
    /// Name used in diagnostics, e.g. "Virtual Field".
    pub fn title(&self) -> &'static str {
        match self {
            Self::Dataset => "Dataset",
            Self::Monitor => "Monitor",
            Self::Notifier => "Notifier",
            Self::Token => "Token",
            Self::User => "User",
            Self::VirtualField => "Virtual Field",
        }
    }

    /// The handler implementing this kind.
    pub fn resource(&self) -> &'static dyn Resource {
        match self {
            Self::Dataset => &dataset::DatasetResource,
            Self::Monitor => &monitor::MonitorResource,
            Self::Notifier => &notifier::NotifierResource,
            Self::Token => &token::TokenResource,
            Self::User => &user::UserResource,
            Self::VirtualField => &virtual_field::VirtualFieldResource,
        }
    }

    /// Shorthand for `self.resource().schema()`.
    pub fn schema(&self) -> Schema {
        self.resource().schema()
    }

    /// All kinds, in declaration order.
    pub fn all() -> impl Iterator<Item = ResourceKind> {
        Self::iter()
    }
}

/// One resource kind's schema, converters and remote calls.
///
/// Implementations are stateless; the client is passed in per call.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The kind this handler serves.
    fn kind(&self) -> ResourceKind;

    /// The attribute schema. Pure.
    fn schema(&self) -> Schema;

    /// Cross-field checks beyond what the schema expresses.
    fn validate(&self, config: &PlanState) -> Diagnostics {
        let _ = config;
        Diagnostics::new()
    }

    /// Create the remote entity and return the flattened result.
    async fn create(&self, client: &dyn AxiomApi, plan: &PlanState)
        -> Result<PlanState, Diagnostics>;

    /// Refresh from the remote entity. A missing entity is reported with a
    /// [`DiagnosticCategory::RemoteNotFound`] error.
    async fn read(&self, client: &dyn AxiomApi, state: &PlanState)
        -> Result<PlanState, Diagnostics>;

    /// Apply `plan` in place to the entity described by `prior`.
    async fn update(
        &self,
        client: &dyn AxiomApi,
        prior: &PlanState,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics>;

    /// Delete the remote entity.
    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics>;

    /// Set when the kind cannot be updated in place at all.
    fn immutable(&self) -> Option<Diagnostic> {
        None
    }
}

// =========================================================================
// Shared helpers for resource implementations
// =========================================================================

/// The `id` attribute, required for every verb except create.
pub(crate) fn require_id(state: &PlanState) -> Result<String, Diagnostics> {
    Ok(state.require::<String>("id")?)
}

pub(crate) fn create_failed(kind: ResourceKind, err: &ApiError) -> Diagnostics {
    remote_error(format!("Unable to create {}", kind.title()), err).into()
}

pub(crate) fn read_failed(kind: ResourceKind, err: &ApiError) -> Diagnostics {
    remote_error(format!("Unable to read {}", kind.title()), err).into()
}

pub(crate) fn update_failed(kind: ResourceKind, err: &ApiError) -> Diagnostics {
    remote_error(format!("Failed to update {}", kind.title()), err).into()
}

pub(crate) fn delete_failed(kind: ResourceKind, err: &ApiError) -> Diagnostics {
    remote_error(format!("Failed to delete {}", kind.title()), err).into()
}

/// An empty string becomes `null`.
pub(crate) fn non_empty(value: &str) -> serde_json::Value {
    if value.is_empty() {
        serde_json::Value::Null
    } else {
        value.into()
    }
}

/// An empty list becomes `null`.
pub(crate) fn non_empty_list<T: ToString>(values: &[T]) -> serde_json::Value {
    if values.is_empty() {
        serde_json::Value::Null
    } else {
        values.iter().map(|v| v.to_string()).collect::<Vec<_>>().into()
    }
}

// =========================================================================
// Reconciler
// =========================================================================

/// What the engine should do with its tracked state after a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Store this state.
    Persist(PlanState),
    /// Stop tracking the instance.
    Remove,
    /// Leave tracked state as it was (or, for create, write nothing).
    Keep,
}

/// Result of one lifecycle call.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// State transition to apply.
    pub transition: Transition,
    /// Diagnostics raised along the way.
    pub diagnostics: Diagnostics,
}

impl Outcome {
    fn persist(state: PlanState) -> Self {
        Self {
            transition: Transition::Persist(state),
            diagnostics: Diagnostics::new(),
        }
    }

    fn remove(diagnostics: Diagnostics) -> Self {
        Self {
            transition: Transition::Remove,
            diagnostics,
        }
    }

    fn keep(diagnostics: Diagnostics) -> Self {
        Self {
            transition: Transition::Keep,
            diagnostics,
        }
    }

    /// Whether any error diagnostic was raised.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Drives [`Resource`] handlers through the lifecycle verbs.
///
/// Holds the single shared client; no other state, retries or caching.
#[derive(Clone, Default)]
pub struct Reconciler {
    client: Option<Arc<dyn AxiomApi>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("configured", &self.client.is_some())
            .finish()
    }
}

impl Reconciler {
    /// A reconciler using `client` for every remote call.
    pub fn new(client: Arc<dyn AxiomApi>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// A reconciler with no client; every remote verb fails with a
    /// configuration error.
    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    /// Whether a client is present.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&dyn AxiomApi, Diagnostics> {
        self.client
            .as_deref()
            .ok_or_else(|| client_not_configured().into())
    }

    /// NoState -> Persisted, or nothing written on error.
    #[instrument(skip(self, resource, plan), fields(resource_type = %resource.kind()))]
    pub async fn create(&self, resource: &dyn Resource, plan: &PlanState) -> Outcome {
        let kind = resource.kind();
        let result = match self.client() {
            Ok(client) => resource.create(client, plan).await,
            Err(diags) => Err(diags),
        };
        match result {
            Ok(state) => {
                info!(resource_type = %kind, id = state.id().unwrap_or_default(), "Create completed successfully");
                Outcome::persist(state)
            }
            Err(diags) => {
                warn!(resource_type = %kind, diagnostics = diags.len(), "Create completed with errors");
                Outcome::keep(diags)
            }
        }
    }

    /// Persisted -> Persisted, or Gone when the entity vanished remotely.
    #[instrument(skip(self, resource, state), fields(resource_type = %resource.kind()))]
    pub async fn read(&self, resource: &dyn Resource, state: &PlanState) -> Outcome {
        let kind = resource.kind();
        let client = match self.client() {
            Ok(client) => client,
            Err(diags) => return Outcome::keep(diags),
        };
        match resource.read(client, state).await {
            Ok(state) => {
                debug!(resource_type = %kind, "Read completed successfully");
                Outcome::persist(state)
            }
            Err(diags) if is_not_found(&diags) => {
                let id = state.id().unwrap_or_default();
                warn!(resource_type = %kind, id, "Remote entity missing, removing from state");
                Outcome::remove(
                    Diagnostic::warning(format!("{} Not Found", kind.title()))
                        .with_detail(format!(
                            "{} with ID {} does not exist and will be recreated if still defined in the configuration.",
                            kind.title(),
                            id
                        ))
                        .with_category(DiagnosticCategory::RemoteNotFound)
                        .into(),
                )
            }
            Err(diags) => {
                error!(resource_type = %kind, diagnostics = diags.len(), "Read failed");
                Outcome::keep(diags)
            }
        }
    }

    /// Persisted -> Persisted, or unchanged on error.
    #[instrument(skip(self, resource, prior, plan), fields(resource_type = %resource.kind()))]
    pub async fn update(
        &self,
        resource: &dyn Resource,
        prior: &PlanState,
        plan: &PlanState,
    ) -> Outcome {
        let kind = resource.kind();
        if let Some(diag) = resource.immutable() {
            warn!(resource_type = %kind, "Update rejected for immutable resource");
            return Outcome::keep(diag.into());
        }
        let result = match self.client() {
            Ok(client) => resource.update(client, prior, plan).await,
            Err(diags) => Err(diags),
        };
        match result {
            Ok(state) => {
                info!(resource_type = %kind, "Update completed successfully");
                Outcome::persist(state)
            }
            Err(diags) => {
                warn!(resource_type = %kind, diagnostics = diags.len(), "Update completed with errors");
                Outcome::keep(diags)
            }
        }
    }

    /// Persisted -> Gone, or still Persisted on error so a retry is possible.
    #[instrument(skip(self, resource, state), fields(resource_type = %resource.kind()))]
    pub async fn delete(&self, resource: &dyn Resource, state: &PlanState) -> Outcome {
        let kind = resource.kind();
        let result = match self.client() {
            Ok(client) => resource.delete(client, state).await,
            Err(diags) => Err(diags),
        };
        match result {
            Ok(()) => {
                info!(resource_type = %kind, "Delete completed successfully");
                Outcome::remove(Diagnostics::new())
            }
            Err(diags) => {
                warn!(resource_type = %kind, diagnostics = diags.len(), "Delete completed with errors");
                Outcome::keep(diags)
            }
        }
    }
}

fn is_not_found(diags: &Diagnostics) -> bool {
    diags
        .iter()
        .any(|d| d.category == Some(DiagnosticCategory::RemoteNotFound))
}
