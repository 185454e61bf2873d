//! `axiom_virtual_field`: query-time computed fields on a dataset.

use async_trait::async_trait;

use super::{
    create_failed, delete_failed, non_empty, read_failed, require_id, update_failed, Resource,
    ResourceKind, SCHEMA_VERSION,
};
use crate::client::models::VirtualField;
use crate::client::AxiomApi;
use crate::diagnostics::Diagnostics;
use crate::schema::{Attribute, Schema};
use crate::state::PlanState;

/// Handler for `axiom_virtual_field`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualFieldResource;

/// Attribute schema of `axiom_virtual_field`.
pub fn schema() -> Schema {
    Schema::new(SCHEMA_VERSION)
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Virtual field identifier"),
        )
        .with_attribute(
            "dataset",
            Attribute::required_string()
                .with_force_new()
                .with_description("Dataset the virtual field belongs to"),
        )
        .with_attribute("name", Attribute::required_string())
        .with_attribute(
            "expression",
            Attribute::required_string().with_description("APL expression"),
        )
        .with_attribute("description", Attribute::optional_string())
        .with_attribute("type", Attribute::optional_string())
        .with_attribute("unit", Attribute::optional_string())
}

/// Build the virtual field described by `plan`.
pub fn extract(plan: &PlanState) -> Result<VirtualField, Diagnostics> {
    Ok(VirtualField {
        id: plan.id().unwrap_or_default().to_string(),
        dataset: plan.require("dataset")?,
        name: plan.require("name")?,
        expression: plan.require("expression")?,
        description: plan.get("description")?.unwrap_or_default(),
        field_type: plan.get("type")?.unwrap_or_default(),
        unit: plan.get("unit")?.unwrap_or_default(),
    })
}

/// Flatten a remote virtual field.
pub fn flatten(field: &VirtualField) -> PlanState {
    PlanState::new()
        .with("id", field.id.as_str())
        .with("dataset", field.dataset.as_str())
        .with("name", field.name.as_str())
        .with("expression", field.expression.as_str())
        .with("description", non_empty(&field.description))
        .with("type", non_empty(&field.field_type))
        .with("unit", non_empty(&field.unit))
}

#[async_trait]
impl Resource for VirtualFieldResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::VirtualField
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(
        &self,
        client: &dyn AxiomApi,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let desired = extract(plan)?;
        let created = client
            .create_virtual_field(&desired)
            .await
            .map_err(|e| create_failed(self.kind(), &e))?;
        Ok(flatten(&created))
    }

    async fn read(
        &self,
        client: &dyn AxiomApi,
        state: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(state)?;
        let field = client
            .get_virtual_field(&id)
            .await
            .map_err(|e| read_failed(self.kind(), &e))?;
        Ok(flatten(&field))
    }

    async fn update(
        &self,
        client: &dyn AxiomApi,
        prior: &PlanState,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(prior)?;
        let mut desired = extract(plan)?;
        desired.id = id.clone();
        let updated = client
            .update_virtual_field(&id, &desired)
            .await
            .map_err(|e| update_failed(self.kind(), &e))?;
        Ok(flatten(&updated))
    }

    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics> {
        let id = require_id(state)?;
        client
            .delete_virtual_field(&id)
            .await
            .map_err(|e| delete_failed(self.kind(), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Reconciler, Transition};
    use crate::testing::FakeAxiom;
    use serde_json::json;
    use std::sync::Arc;

    fn duration_ms() -> VirtualField {
        VirtualField {
            id: "vfd_1".to_string(),
            dataset: "traces".to_string(),
            name: "duration_ms".to_string(),
            expression: "duration / 1000000".to_string(),
            description: "Span duration".to_string(),
            field_type: "number".to_string(),
            unit: "ms".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let field = duration_ms();
        assert_eq!(extract(&flatten(&field)).unwrap(), field);

        let bare = VirtualField {
            description: String::new(),
            field_type: String::new(),
            unit: String::new(),
            ..duration_ms()
        };
        let state = flatten(&bare);
        assert!(state.is_null("unit"));
        assert_eq!(extract(&state).unwrap(), bare);
    }

    #[test]
    fn test_extract_missing_expression() {
        let err = extract(&PlanState::new().with("dataset", "traces").with("name", "x"))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].attribute.as_deref(), Some("expression"));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let plan = flatten(&duration_ms()).with("id", serde_json::Value::Null);

        let Transition::Persist(prior) = reconciler.create(&VirtualFieldResource, &plan).await.transition
        else {
            panic!("expected persisted state");
        };

        let desired = prior.clone().with("unit", "s").with("expression", "duration / 1000000000");
        let Transition::Persist(state) = reconciler
            .update(&VirtualFieldResource, &prior, &desired)
            .await
            .transition
        else {
            panic!("expected persisted state");
        };
        assert_eq!(state.raw("unit"), Some(&json!("s")));

        let outcome = reconciler.delete(&VirtualFieldResource, &state).await;
        assert_eq!(outcome.transition, Transition::Remove);
        assert_eq!(fake.calls("delete_virtual_field"), 1);
    }
}
