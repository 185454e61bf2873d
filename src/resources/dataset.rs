//! `axiom_dataset`: event and OpenTelemetry datasets.

use std::str::FromStr;

use async_trait::async_trait;
use strum::IntoEnumIterator;

use super::{
    create_failed, delete_failed, non_empty, non_empty_list, read_failed, require_id,
    update_failed, Resource, ResourceKind, SCHEMA_VERSION,
};
use crate::client::models::{Dataset, DatasetCreateRequest, DatasetKind, DatasetUpdateRequest};
use crate::client::AxiomApi;
use crate::diagnostics::{conversion_error, remote_error, validation_error, Diagnostics};
use crate::schema::{Attribute, AttributeFlags, Constraint, Schema, Validator};
use crate::state::PlanState;

/// Rule for `retention_days` when retention is enabled.
pub const RETENTION_MESSAGE: &str =
    "Retention days must be greater than 0 when use_retention_period is true";

const MAP_FIELD_PATTERN: &str = r"^[a-zA-Z0-9]+([a-zA-Z0-9_.-]*[a-zA-Z0-9]+)?$";

/// Handler for `axiom_dataset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetResource;

/// Attribute schema of `axiom_dataset`.
pub fn schema() -> Schema {
    Schema::new(SCHEMA_VERSION)
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Dataset identifier"),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::non_empty())
                .with_description("Name of the dataset"),
        )
        .with_attribute(
            "kind",
            Attribute::optional_computed_string()
                .with_force_new()
                .with_default(DatasetKind::default().to_string().into())
                .with_validator(Validator::one_of(DatasetKind::iter().map(|k| k.to_string())))
                .with_description("Storage kind of the dataset"),
        )
        .with_attribute(
            "description",
            Attribute::optional_computed_string().with_description("Dataset description"),
        )
        .with_attribute(
            "use_retention_period",
            Attribute::optional_computed_bool().with_description("Use retention for the dataset"),
        )
        .with_attribute(
            "retention_days",
            Attribute::optional_computed_int64()
                .with_description("Retention days for the dataset"),
        )
        .with_attribute(
            "map_fields",
            Attribute::string_list(AttributeFlags::optional_computed())
                .with_validator(Validator::each_matches(
                    MAP_FIELD_PATTERN,
                    "Field names must start and end with a letter or digit",
                ))
                .with_validator(Validator::UniqueValues)
                .with_description("Fields stored as maps"),
        )
        .with_attribute(
            "object_fields",
            Attribute::string_list(AttributeFlags::optional_computed())
                .with_description("Fields stored as objects"),
        )
        .with_constraint(Constraint::PositiveWhen {
            attribute: "retention_days".to_string(),
            when: "use_retention_period".to_string(),
            message: RETENTION_MESSAGE.to_string(),
        })
}

/// Build the remote dataset described by `plan`.
///
/// Retention days are zeroed when retention is disabled.
pub fn extract(plan: &PlanState) -> Result<Dataset, Diagnostics> {
    let schema = schema();

    let name: String = plan.require("name")?;
    let kind = match plan.field::<String>(&schema, "kind")?.into_option() {
        None => DatasetKind::default(),
        Some(raw) => DatasetKind::from_str(&raw)
            .map_err(|_| conversion_error("kind", format!("unknown dataset kind '{raw}'")))?,
    };

    let use_retention_period = plan
        .field::<bool>(&schema, "use_retention_period")?
        .unwrap_or_default();
    let retention_days = if use_retention_period {
        match plan.field::<i64>(&schema, "retention_days")?.into_option() {
            Some(days) if days > 0 => days,
            _ => {
                return Err(validation_error("Invalid retention", RETENTION_MESSAGE)
                    .with_attribute("retention_days")
                    .into())
            }
        }
    } else {
        0
    };

    Ok(Dataset {
        id: plan.id().unwrap_or_default().to_string(),
        name,
        kind,
        description: plan.get("description")?.unwrap_or_default(),
        use_retention_period,
        retention_days,
        map_fields: plan.get("map_fields")?.unwrap_or_default(),
        object_fields: plan.get("object_fields")?.unwrap_or_default(),
    })
}

/// Flatten a remote dataset. Empty strings and lists become `null`.
pub fn flatten(dataset: &Dataset) -> PlanState {
    PlanState::new()
        .with("id", dataset.id.as_str())
        .with("name", dataset.name.as_str())
        .with("kind", dataset.kind.to_string())
        .with("description", non_empty(&dataset.description))
        .with("use_retention_period", dataset.use_retention_period)
        .with("retention_days", dataset.retention_days)
        .with("map_fields", non_empty_list(&dataset.map_fields))
        .with("object_fields", non_empty_list(&dataset.object_fields))
}

impl From<&Dataset> for DatasetCreateRequest {
    fn from(ds: &Dataset) -> Self {
        Self {
            name: ds.name.clone(),
            kind: ds.kind,
            description: ds.description.clone(),
            use_retention_period: ds.use_retention_period,
            retention_days: ds.retention_days,
            object_fields: ds.object_fields.clone(),
        }
    }
}

impl From<&Dataset> for DatasetUpdateRequest {
    fn from(ds: &Dataset) -> Self {
        Self {
            description: ds.description.clone(),
            use_retention_period: ds.use_retention_period,
            retention_days: ds.retention_days,
            object_fields: ds.object_fields.clone(),
        }
    }
}

/// Replace the dataset's map fields with `fields`. `None` leaves them alone.
async fn sync_map_fields(
    client: &dyn AxiomApi,
    fields: Option<Vec<String>>,
    dataset: &mut Dataset,
) -> Result<(), Diagnostics> {
    let Some(fields) = fields else {
        return Ok(());
    };
    dataset.map_fields = client
        .update_dataset_map_fields(&dataset.id, &fields)
        .await
        .map_err(|e| Diagnostics::from(remote_error("Failed to update dataset map fields", &e)))?;
    Ok(())
}

#[async_trait]
impl Resource for DatasetResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Dataset
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
        let mut created = client
            .create_dataset(&DatasetCreateRequest::from(&desired))
            .await
            .map_err(|e| create_failed(self.kind(), &e))?;
        let declared = plan.get::<Vec<String>>("map_fields")?;
        sync_map_fields(client, declared, &mut created).await?;
        Ok(flatten(&created))
    }

    async fn read(
        &self,
        client: &dyn AxiomApi,
        state: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(state)?;
        let dataset = client
            .get_dataset(&id)
            .await
            .map_err(|e| read_failed(self.kind(), &e))?;
        Ok(flatten(&dataset))
    }

    async fn update(
        &self,
        client: &dyn AxiomApi,
        prior: &PlanState,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(prior)?;
        let desired = extract(plan)?;
        let mut updated = client
            .update_dataset(&id, &DatasetUpdateRequest::from(&desired))
            .await
            .map_err(|e| update_failed(self.kind(), &e))?;
        // A null plan value after the prior state had map fields clears them.
        let declared = plan.get::<Vec<String>>("map_fields")?;
        let had_fields = prior
            .get::<Vec<String>>("map_fields")?
            .is_some_and(|fields| !fields.is_empty());
        let fields = match declared {
            Some(fields) => Some(fields),
            None if had_fields => Some(Vec::new()),
            None => None,
        };
        sync_map_fields(client, fields, &mut updated).await?;
        Ok(flatten(&updated))
    }

    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics> {
        let id = require_id(state)?;
        client
            .delete_dataset(&id)
            .await
            .map_err(|e| delete_failed(self.kind(), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Reconciler, Transition};
    use crate::schema::DiagnosticCategory;
    use crate::testing::FakeAxiom;
    use crate::validation::validate;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn plan(value: serde_json::Value) -> PlanState {
        PlanState::from_value(value).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let dataset = Dataset {
            id: "traces".to_string(),
            name: "traces".to_string(),
            kind: DatasetKind::OtelTraces,
            description: "OTel traces".to_string(),
            use_retention_period: true,
            retention_days: 30,
            map_fields: vec!["attributes.custom".to_string()],
            object_fields: vec!["resource".to_string()],
        };
        assert_eq!(extract(&flatten(&dataset)).unwrap(), dataset);

        let bare = Dataset {
            id: "logs".to_string(),
            name: "logs".to_string(),
            ..Default::default()
        };
        assert_eq!(extract(&flatten(&bare)).unwrap(), bare);
    }

    #[test]
    fn test_flatten_empty_values_to_null() {
        let state = flatten(&Dataset {
            id: "logs".to_string(),
            name: "logs".to_string(),
            ..Default::default()
        });
        assert!(state.is_null("description"));
        assert!(state.is_null("map_fields"));
        assert!(state.is_null("object_fields"));
        assert_eq!(state.raw("kind"), Some(&json!("axiom:events:v1")));
        assert_eq!(state.raw("retention_days"), Some(&json!(0)));
    }

    #[test]
    fn test_extract_retention_rule() {
        let err = extract(&plan(json!({
            "name": "ds1",
            "use_retention_period": true,
            "retention_days": 0
        })))
        .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].detail.as_deref(), Some(RETENTION_MESSAGE));
        assert_eq!(err[0].category, Some(DiagnosticCategory::Validation));

        let err = extract(&plan(json!({"name": "ds1", "use_retention_period": true})))
            .unwrap_err();
        assert_eq!(err[0].attribute.as_deref(), Some("retention_days"));
    }

    #[test]
    fn test_extract_zeroes_disabled_retention() {
        let ds = extract(&plan(json!({
            "name": "ds1",
            "use_retention_period": false,
            "retention_days": 14
        })))
        .unwrap();
        assert_eq!(ds.retention_days, 0);
        assert_eq!(ds.kind, DatasetKind::Events);
    }

    #[test]
    fn test_extract_unknown_kind() {
        let err = extract(&plan(json!({"name": "ds1", "kind": "otel:profiles:v1"}))).unwrap_err();
        assert_eq!(err[0].category, Some(DiagnosticCategory::Conversion));
        assert_eq!(err[0].attribute.as_deref(), Some("kind"));
    }

    #[test]
    fn test_schema_rules() {
        let schema = schema();
        assert!(validate(&schema, &json!({"name": "ds1"})).is_empty());

        let diags = validate(
            &schema,
            &json!({"name": "ds1", "use_retention_period": true, "retention_days": 0}),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, RETENTION_MESSAGE);

        let diags = validate(&schema, &json!({"name": ""}));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("name"));

        let diags = validate(
            &schema,
            &json!({"name": "ds1", "map_fields": ["ok.field", "_bad", "ok.field"]}),
        );
        assert_eq!(diags.len(), 2);

        let mut paths = schema.force_new_paths();
        paths.sort_unstable();
        assert_eq!(paths, vec!["kind", "name"]);
    }

    #[tokio::test]
    async fn test_create_with_retention_disabled() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());

        let outcome = reconciler
            .create(
                &DatasetResource,
                &plan(json!({"name": "ds1", "use_retention_period": false})),
            )
            .await;

        let Transition::Persist(state) = outcome.transition else {
            panic!("expected persisted state, got {:?}", outcome);
        };
        assert_eq!(state.id(), Some("ds1"));
        assert_eq!(state.raw("retention_days"), Some(&json!(0)));

        let body = fake.last_body("create_dataset").unwrap();
        assert_eq!(body["useRetentionPeriod"], json!(false));
        assert_eq!(body["retentionDays"], json!(0));
        assert_eq!(fake.calls("update_dataset_map_fields"), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_retention_without_remote_call() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());

        let outcome = reconciler
            .create(
                &DatasetResource,
                &plan(json!({"name": "ds1", "use_retention_period": true, "retention_days": 0})),
            )
            .await;

        assert_eq!(outcome.transition, Transition::Keep);
        assert!(outcome.has_errors());
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_syncs_map_fields() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());

        let outcome = reconciler
            .create(
                &DatasetResource,
                &plan(json!({"name": "ds1", "map_fields": ["attributes.custom"]})),
            )
            .await;

        let Transition::Persist(state) = outcome.transition else {
            panic!("expected persisted state");
        };
        assert_eq!(state.raw("map_fields"), Some(&json!(["attributes.custom"])));
        assert_eq!(fake.calls("update_dataset_map_fields"), 1);
    }

    #[tokio::test]
    async fn test_update_sends_mutable_fields() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let created = reconciler
            .create(&DatasetResource, &plan(json!({"name": "ds1"})))
            .await;
        let Transition::Persist(prior) = created.transition else {
            panic!("expected persisted state");
        };

        let desired = prior
            .clone()
            .with("description", "audit trail")
            .with("use_retention_period", true)
            .with("retention_days", 90);
        let outcome = reconciler.update(&DatasetResource, &prior, &desired).await;

        let Transition::Persist(state) = outcome.transition else {
            panic!("expected persisted state");
        };
        assert_eq!(state.raw("description"), Some(&json!("audit trail")));
        assert_eq!(state.raw("retention_days"), Some(&json!(90)));
        let body = fake.last_body("update_dataset").unwrap();
        assert_eq!(
            body,
            json!({"description": "audit trail", "useRetentionPeriod": true, "retentionDays": 90})
        );
        assert_eq!(fake.calls("update_dataset_map_fields"), 0);
    }

    #[tokio::test]
    async fn test_update_clears_removed_map_fields() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let created = reconciler
            .create(
                &DatasetResource,
                &plan(json!({"name": "ds1", "map_fields": ["attributes.custom"]})),
            )
            .await;
        let Transition::Persist(prior) = created.transition else {
            panic!("expected persisted state");
        };

        let desired = prior.clone().with("map_fields", serde_json::Value::Null);
        let outcome = reconciler.update(&DatasetResource, &prior, &desired).await;

        let Transition::Persist(state) = outcome.transition else {
            panic!("expected persisted state, got {:?}", outcome);
        };
        assert!(state.is_null("map_fields"));
        assert_eq!(fake.calls("update_dataset_map_fields"), 2);
        assert_eq!(fake.last_body("update_dataset_map_fields"), Some(json!([])));
    }
}
