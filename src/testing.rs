//! Testing utilities for the provider.
//!
//! [`FakeAxiom`] is an in-memory [`AxiomApi`] with call counters and
//! injectable failures. [`ProviderTester`] drives a [`ProviderService`]
//! through whole lifecycles without a transport in between.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use axiom_provider::testing::{FakeAxiom, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_dataset() {
//!     let fake = Arc::new(FakeAxiom::new());
//!     let tester = ProviderTester::with_fake(fake.clone());
//!
//!     let state = tester
//!         .lifecycle_create("axiom_dataset", json!({"name": "logs"}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["id"], "logs");
//!     assert!(fake.has_dataset("logs"));
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::client::models::{
    ApiToken, CreateTokenRequest, CreateUserRequest, CreatedToken, Dataset, DatasetCreateRequest,
    DatasetUpdateRequest, Monitor, Notifier, UpdateUserRequest, User, UserRole, VirtualField,
};
use crate::client::{ApiError, AxiomApi};
use crate::error::ProviderError;
use crate::provider::AxiomProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ResourceResponse};

// =========================================================================
// FakeAxiom
// =========================================================================

#[derive(Debug, Default)]
struct FakeState {
    datasets: BTreeMap<String, Dataset>,
    monitors: BTreeMap<String, Monitor>,
    notifiers: BTreeMap<String, Notifier>,
    tokens: BTreeMap<String, ApiToken>,
    users: BTreeMap<String, User>,
    virtual_fields: BTreeMap<String, VirtualField>,
    calls: BTreeMap<&'static str, usize>,
    bodies: BTreeMap<&'static str, Value>,
    next_failure: Option<(u16, String)>,
    next_id: u64,
}

impl FakeState {
    fn assign_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }
}

/// An in-memory stand-in for the Axiom API.
///
/// Every trait call is counted by method name, and request bodies are kept
/// so tests can assert on what would have gone over the wire. Unknown ids
/// answer with HTTP 404.
#[derive(Debug, Default)]
pub struct FakeAxiom {
    state: Mutex<FakeState>,
}

impl FakeAxiom {
    /// An empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test may poison the lock; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a dataset, keyed by its id.
    pub fn insert_dataset(&self, dataset: Dataset) {
        self.lock().datasets.insert(dataset.id.clone(), dataset);
    }

    /// Whether a dataset with `id` exists.
    pub fn has_dataset(&self, id: &str) -> bool {
        self.lock().datasets.contains_key(id)
    }

    /// Make the next call, whatever it is, fail with an API error.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.lock().next_failure = Some((status, message.to_string()));
    }

    /// How often `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Total number of calls across all methods.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// The JSON body most recently sent to `method`.
    pub fn last_body(&self, method: &str) -> Option<Value> {
        self.lock().bodies.get(method).cloned()
    }

    /// Count the call, remember its body and consume a pending failure.
    fn begin(
        &self,
        method: &'static str,
        body: Option<&impl Serialize>,
    ) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.lock();
        *state.calls.entry(method).or_default() += 1;
        if let Some(body) = body {
            let value = serde_json::to_value(body).unwrap_or(Value::Null);
            state.bodies.insert(method, value);
        }
        match state.next_failure.take() {
            Some((status, message)) => Err(ApiError::Api { status, message }),
            None => Ok(state),
        }
    }
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::Api {
        status: 404,
        message: format!("{} {} not found", kind, id),
    }
}

fn lookup<T: Clone>(map: &BTreeMap<String, T>, kind: &str, id: &str) -> Result<T, ApiError> {
    map.get(id).cloned().ok_or_else(|| not_found(kind, id))
}

fn remove<T>(map: &mut BTreeMap<String, T>, kind: &str, id: &str) -> Result<(), ApiError> {
    map.remove(id).map(|_| ()).ok_or_else(|| not_found(kind, id))
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl AxiomApi for FakeAxiom {
    async fn create_dataset(&self, request: &DatasetCreateRequest) -> Result<Dataset, ApiError> {
        let mut state = self.begin("create_dataset", Some(request))?;
        let dataset = Dataset {
            id: request.name.clone(),
            name: request.name.clone(),
            kind: request.kind,
            description: request.description.clone(),
            use_retention_period: request.use_retention_period,
            retention_days: request.retention_days,
            map_fields: Vec::new(),
            object_fields: request.object_fields.clone(),
        };
        state.datasets.insert(dataset.id.clone(), dataset.clone());
        Ok(dataset)
    }

    async fn get_dataset(&self, id: &str) -> Result<Dataset, ApiError> {
        let state = self.begin("get_dataset", NO_BODY)?;
        lookup(&state.datasets, "dataset", id)
    }

    async fn update_dataset(
        &self,
        id: &str,
        request: &DatasetUpdateRequest,
    ) -> Result<Dataset, ApiError> {
        let mut state = self.begin("update_dataset", Some(request))?;
        let dataset = state
            .datasets
            .get_mut(id)
            .ok_or_else(|| not_found("dataset", id))?;
        dataset.description = request.description.clone();
        dataset.use_retention_period = request.use_retention_period;
        dataset.retention_days = request.retention_days;
        dataset.object_fields = request.object_fields.clone();
        Ok(dataset.clone())
    }

    async fn update_dataset_map_fields(
        &self,
        id: &str,
        fields: &[String],
    ) -> Result<Vec<String>, ApiError> {
        let mut state = self.begin("update_dataset_map_fields", Some(&fields))?;
        let dataset = state
            .datasets
            .get_mut(id)
            .ok_or_else(|| not_found("dataset", id))?;
        dataset.map_fields = fields.to_vec();
        Ok(dataset.map_fields.clone())
    }

    async fn delete_dataset(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete_dataset", NO_BODY)?;
        remove(&mut state.datasets, "dataset", id)
    }

    async fn create_monitor(&self, monitor: &Monitor) -> Result<Monitor, ApiError> {
        let mut state = self.begin("create_monitor", Some(monitor))?;
        let created = Monitor {
            id: state.assign_id("mon"),
            ..monitor.clone()
        };
        state.monitors.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError> {
        let state = self.begin("get_monitor", NO_BODY)?;
        lookup(&state.monitors, "monitor", id)
    }

    async fn update_monitor(&self, id: &str, monitor: &Monitor) -> Result<Monitor, ApiError> {
        let mut state = self.begin("update_monitor", Some(monitor))?;
        let stored = state
            .monitors
            .get_mut(id)
            .ok_or_else(|| not_found("monitor", id))?;
        *stored = Monitor {
            id: id.to_string(),
            ..monitor.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_monitor(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete_monitor", NO_BODY)?;
        remove(&mut state.monitors, "monitor", id)
    }

    async fn create_notifier(&self, notifier: &Notifier) -> Result<Notifier, ApiError> {
        let mut state = self.begin("create_notifier", Some(notifier))?;
        let created = Notifier {
            id: state.assign_id("ntf"),
            ..notifier.clone()
        };
        state.notifiers.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_notifier(&self, id: &str) -> Result<Notifier, ApiError> {
        let state = self.begin("get_notifier", NO_BODY)?;
        lookup(&state.notifiers, "notifier", id)
    }

    async fn update_notifier(&self, id: &str, notifier: &Notifier) -> Result<Notifier, ApiError> {
        let mut state = self.begin("update_notifier", Some(notifier))?;
        let stored = state
            .notifiers
            .get_mut(id)
            .ok_or_else(|| not_found("notifier", id))?;
        *stored = Notifier {
            id: id.to_string(),
            ..notifier.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_notifier(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete_notifier", NO_BODY)?;
        remove(&mut state.notifiers, "notifier", id)
    }

    async fn create_token(&self, request: &CreateTokenRequest) -> Result<CreatedToken, ApiError> {
        let mut state = self.begin("create_token", Some(request))?;
        let info = ApiToken {
            id: state.assign_id("tok"),
            name: request.name.clone(),
            description: request.description.clone(),
            expires_at: request.expires_at,
            dataset_capabilities: request.dataset_capabilities.clone(),
            org_capabilities: request.org_capabilities.clone(),
        };
        state.tokens.insert(info.id.clone(), info.clone());
        let token = format!("xaat-{:08x}", state.next_id);
        Ok(CreatedToken { info, token })
    }

    async fn get_token(&self, id: &str) -> Result<ApiToken, ApiError> {
        let state = self.begin("get_token", NO_BODY)?;
        lookup(&state.tokens, "token", id)
    }

    async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete_token", NO_BODY)?;
        remove(&mut state.tokens, "token", id)
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, ApiError> {
        let mut state = self.begin("create_user", Some(request))?;
        let user = User {
            id: state.assign_id("usr"),
            name: request.name.clone(),
            email: request.email.clone(),
            role: UserRole {
                id: request.role.clone(),
                name: String::new(),
            },
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        let state = self.begin("get_user", NO_BODY)?;
        lookup(&state.users, "user", id)
    }

    async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> Result<User, ApiError> {
        let mut state = self.begin("update_user", Some(request))?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| not_found("user", id))?;
        user.name = request.name.clone();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete_user", NO_BODY)?;
        remove(&mut state.users, "user", id)
    }

    async fn create_virtual_field(&self, field: &VirtualField) -> Result<VirtualField, ApiError> {
        let mut state = self.begin("create_virtual_field", Some(field))?;
        let created = VirtualField {
            id: state.assign_id("vfd"),
            ..field.clone()
        };
        state
            .virtual_fields
            .insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_virtual_field(&self, id: &str) -> Result<VirtualField, ApiError> {
        let state = self.begin("get_virtual_field", NO_BODY)?;
        lookup(&state.virtual_fields, "virtual field", id)
    }

    async fn update_virtual_field(
        &self,
        id: &str,
        field: &VirtualField,
    ) -> Result<VirtualField, ApiError> {
        let mut state = self.begin("update_virtual_field", Some(field))?;
        let stored = state
            .virtual_fields
            .get_mut(id)
            .ok_or_else(|| not_found("virtual field", id))?;
        *stored = VirtualField {
            id: id.to_string(),
            ..field.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_virtual_field(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete_virtual_field", NO_BODY)?;
        remove(&mut state.virtual_fields, "virtual field", id)
    }
}

// =========================================================================
// ProviderTester
// =========================================================================

/// A test harness around a [`ProviderService`] implementation.
///
/// Lifecycle verbs are exposed raw; the `lifecycle_*` helpers chain them and
/// turn error diagnostics into [`TestError`]s.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<AxiomProvider> {
    /// A tester for [`AxiomProvider`] already configured with `fake`.
    pub fn with_fake(fake: Arc<FakeAxiom>) -> Self {
        Self::new(AxiomProvider::with_client(fake))
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<ResourceResponse, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        let plan = self.plan_create(resource_type, config).await?;
        check_diagnostics(plan.diagnostics)?;

        let created = expect_state(self.create(resource_type, plan.planned_state).await?)?;
        expect_state(self.read(resource_type, created).await?)
    }

    /// Plan, update, then read back. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, TestError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        check_diagnostics(plan.diagnostics)?;

        let updated = expect_state(
            self.update(resource_type, prior_state, plan.planned_state)
                .await?,
        )?;
        expect_state(self.read(resource_type, updated).await?)
    }

    /// Plan a destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), TestError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;

        let response = self.delete(resource_type, current_state).await?;
        check_diagnostics(response.diagnostics)?;
        match response.new_state {
            None => Ok(()),
            Some(state) => Err(TestError::UnexpectedState(state)),
        }
    }

    /// Create, update and delete in turn. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, TestError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;

        let mut proposed = updated_config;
        if let (Value::Object(map), Some(id)) = (&mut proposed, created.get("id")) {
            map.entry("id").or_insert_with(|| id.clone());
        }
        let updated = self
            .lifecycle_update(resource_type, created, proposed)
            .await?;

        self.lifecycle_delete(resource_type, updated.clone())
            .await?;

        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
    /// The operation left no state where one was expected.
    MissingState,
    /// The operation left state where none was expected.
    UnexpectedState(Value),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
            TestError::MissingState => write!(f, "Operation returned no state"),
            TestError::UnexpectedState(state) => {
                write!(f, "Operation unexpectedly returned state: {}", state)
            }
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// The new state of a response without error diagnostics.
fn expect_state(response: ResourceResponse) -> Result<Value, TestError> {
    check_diagnostics(response.diagnostics)?;
    response.new_state.ok_or(TestError::MissingState)
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}
