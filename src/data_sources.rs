//! Read-only data sources, one per resource kind.
//!
//! A data source looks an entity up by `id` and returns its flattened
//! attributes. Its schema is derived from the resource schema.

use tracing::{info, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::resources::{Reconciler, ResourceKind, Transition};
use crate::schema::{
    Attribute, AttributeFlags, Block, DiagnosticCategory, DiagnosticSeverity, Schema,
};
use crate::state::PlanState;

/// Attributes that never leave the provider through a data source.
const WITHHELD: &[&str] = &["token"];

/// Derive the data source schema for `kind`.
///
/// Every attribute becomes computed and `id` becomes required. Defaults,
/// validators, constraints and replace flags are dropped.
pub fn schema(kind: ResourceKind) -> Schema {
    let resource = kind.schema();
    let mut block = computed_block(&resource.block);
    for name in WITHHELD {
        block.attributes.remove(*name);
    }
    block.attributes.insert(
        "id".to_string(),
        Attribute::required_string().with_description("Identifier of the entity to look up"),
    );
    Schema {
        version: resource.version,
        block,
    }
}

fn computed_block(block: &Block) -> Block {
    let attributes = block
        .attributes
        .iter()
        .map(|(name, attr)| {
            let flags = AttributeFlags {
                sensitive: attr.flags.sensitive,
                ..AttributeFlags::computed()
            };
            let mut derived = Attribute::new(attr.attr_type.clone(), flags);
            derived.description = attr.description.clone();
            (name.clone(), derived)
        })
        .collect();
    let blocks = block
        .blocks
        .iter()
        .map(|(name, nested)| {
            let mut derived = nested.clone();
            derived.block = computed_block(&nested.block);
            derived.min_items = 0;
            derived.force_new = false;
            (name.clone(), derived)
        })
        .collect();
    Block {
        attributes,
        blocks,
        constraints: Vec::new(),
        description: block.description.clone(),
    }
}

/// Look up the entity named by `config.id` and flatten it.
///
/// Unlike a resource read, a missing entity is an error here.
#[instrument(skip(reconciler, config), fields(data_source = %kind))]
pub async fn read(
    reconciler: &Reconciler,
    kind: ResourceKind,
    config: &PlanState,
) -> Result<PlanState, Diagnostics> {
    let lookup = PlanState::new().with("id", config.require::<String>("id")?);
    let outcome = reconciler.read(kind.resource(), &lookup).await;

    match outcome.transition {
        Transition::Persist(state) => {
            let visible: serde_json::Map<String, serde_json::Value> = state
                .iter()
                .filter(|(name, _)| !WITHHELD.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            info!(data_source = %kind, "ReadDataSource completed successfully");
            Ok(visible.into())
        }
        Transition::Remove => {
            warn!(data_source = %kind, "Data source lookup found nothing");
            Err(outcome
                .diagnostics
                .into_iter()
                .map(|d| {
                    let mut d = d.with_category(DiagnosticCategory::RemoteNotFound);
                    d.severity = DiagnosticSeverity::Error;
                    d
                })
                .collect())
        }
        Transition::Keep => Err(outcome.diagnostics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::{Dataset, DatasetKind};
    use crate::testing::FakeAxiom;
    use crate::validation::validate;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_schema_is_computed_except_id() {
        for kind in ResourceKind::all() {
            let schema = schema(kind);
            for (name, attr) in &schema.block.attributes {
                if name == "id" {
                    assert!(attr.flags.required, "{kind}.id");
                } else {
                    assert!(attr.flags.is_computed_only(), "{kind}.{name}");
                    assert!(attr.default.is_none(), "{kind}.{name}");
                    assert!(attr.validators.is_empty(), "{kind}.{name}");
                }
            }
            assert!(schema.force_new_paths().is_empty(), "{kind}");
        }
    }

    #[test]
    fn test_token_schema_withholds_secret() {
        let schema = schema(ResourceKind::Token);
        assert!(schema.attribute("token").is_none());
        assert!(schema.block.blocks["org_capabilities"].block.attributes["monitors"]
            .flags
            .is_computed_only());
    }

    #[test]
    fn test_schema_requires_id() {
        let schema = schema(ResourceKind::Monitor);
        assert!(validate(&schema, &json!({"id": "mon_1"})).is_empty());
        assert_eq!(validate(&schema, &json!({})).len(), 1);
    }

    #[tokio::test]
    async fn test_read_dataset() {
        let fake = Arc::new(FakeAxiom::new());
        fake.insert_dataset(Dataset {
            id: "logs".to_string(),
            name: "logs".to_string(),
            kind: DatasetKind::OtelLogs,
            description: "app logs".to_string(),
            ..Default::default()
        });
        let reconciler = Reconciler::new(fake);

        let state = read(
            &reconciler,
            ResourceKind::Dataset,
            &PlanState::new().with("id", "logs"),
        )
        .await
        .unwrap();

        assert_eq!(state.raw("kind"), Some(&json!("otel:logs:v1")));
        assert_eq!(state.raw("description"), Some(&json!("app logs")));
    }

    #[tokio::test]
    async fn test_read_missing_is_fatal() {
        let reconciler = Reconciler::new(Arc::new(FakeAxiom::new()));

        let err = read(
            &reconciler,
            ResourceKind::User,
            &PlanState::new().with("id", "usr_404"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.len(), 1);
        assert!(err[0].is_error());
        assert_eq!(err[0].category, Some(DiagnosticCategory::RemoteNotFound));
        assert_eq!(err[0].summary, "User Not Found");
    }
}
