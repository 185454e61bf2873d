//! Request and response types exchanged through [`ProviderService`](crate::ProviderService).

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::schema::Diagnostic;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute name.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state; `null` when the resource is to be destroyed.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
    /// Problems found while planning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self::with_changes(state, Vec::new(), false)
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }

    /// A plan that could not be produced; the prior state is kept.
    pub fn failed(prior_state: serde_json::Value, diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics: diagnostics.into_vec(),
            ..Self::no_change(prior_state)
        }
    }

    /// Whether the plan has no attribute changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// The outcome of a lifecycle verb as seen by the engine.
///
/// `new_state` is the state to persist. `None` means nothing is tracked
/// afterwards: the resource was deleted, vanished remotely, or was never
/// created.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// State to persist, if any.
    pub new_state: Option<serde_json::Value>,
    /// Errors and warnings produced by the call.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourceResponse {
    /// A response carrying a state and no diagnostics.
    pub fn state(state: serde_json::Value) -> Self {
        Self {
            new_state: Some(state),
            diagnostics: Vec::new(),
        }
    }

    /// A response with no state.
    pub fn gone() -> Self {
        Self::default()
    }

    /// Attach diagnostics.
    pub fn with_diagnostics(mut self, diagnostics: impl Into<Vec<Diagnostic>>) -> Self {
        self.diagnostics.extend(diagnostics.into());
        self
    }

    /// Whether any error-severity diagnostic is present.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata listing the served type names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Capability flags advertised to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether `plan` accepts a null proposed state and plans a destroy.
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("logs"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("logs")));

        let removed = AttributeChange::removed("description", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("threshold", json!(1.0), json!(5.0));
        assert_eq!(modified.before, Some(json!(1.0)));
        assert_eq!(modified.after, Some(json!(5.0)));
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "ds1"}));
        assert!(no_change.is_empty());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"id": "ds1", "name": "ds2"}),
            vec![AttributeChange::modified("name", json!("ds1"), json!("ds2"))],
            true,
        );
        assert_eq!(with_changes.changes.len(), 1);
        assert!(with_changes.requires_replace);

        let failed = PlanResult::failed(
            json!({"id": "ds1"}),
            Diagnostic::error("Invalid state").into(),
        );
        assert!(failed.is_empty());
        assert_eq!(failed.diagnostics.len(), 1);
    }

    #[test]
    fn test_resource_response() {
        let ok = ResourceResponse::state(json!({"id": "mon_1"}));
        assert!(!ok.has_errors());

        let gone = ResourceResponse::gone()
            .with_diagnostics(vec![Diagnostic::warning("Monitor Not Found")]);
        assert!(gone.new_state.is_none());
        assert!(!gone.has_errors());

        let failed = ResourceResponse::gone().with_diagnostics(vec![Diagnostic::error("boom")]);
        assert!(failed.has_errors());
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("axiom_dataset", json!({"id": "logs"}));
        assert_eq!(imported.resource_type, "axiom_dataset");
        assert_eq!(imported.state["id"], "logs");
    }
}
