//! `axiom_token`: API tokens with dataset and organisation capabilities.
//!
//! Tokens are create-once. Every attribute forces replacement and the secret
//! is only returned by the create call, so reads carry it over from the prior
//! state.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::{
    create_failed, delete_failed, non_empty, non_empty_list, read_failed, require_id, Resource,
    ResourceKind, SCHEMA_VERSION,
};
use crate::client::models::{
    Action, ApiToken, CreateTokenRequest, CreatedToken, DatasetCapabilities, OrgCapabilities,
};
use crate::client::AxiomApi;
use crate::diagnostics::{conversion_error, validation_error, Diagnostics};
use crate::schema::{
    Attribute, AttributeFlags, Block, Diagnostic, DiagnosticCategory, NestedBlock, Schema,
    Validator,
};
use crate::state::PlanState;

const CRUD: &[Action] = &[Action::Create, Action::Read, Action::Update, Action::Delete];

/// Per-dataset capabilities and the actions each accepts.
pub const DATASET_CAPABILITIES: [(&str, &[Action]); 7] = [
    ("ingest", &[Action::Create]),
    ("query", &[Action::Read]),
    ("starred_queries", CRUD),
    ("virtual_fields", CRUD),
    ("data", &[Action::Delete]),
    ("trim", &[Action::Update]),
    ("vacuum", &[Action::Update]),
];

/// Organisation capabilities and the actions each accepts.
pub const ORG_CAPABILITIES: [(&str, &[Action]); 14] = [
    ("annotations", CRUD),
    ("api_tokens", CRUD),
    ("audit_log", &[Action::Read]),
    ("billing", &[Action::Read, Action::Update]),
    ("dashboards", CRUD),
    ("datasets", CRUD),
    ("endpoints", CRUD),
    ("flows", CRUD),
    ("integrations", CRUD),
    ("monitors", CRUD),
    ("notifiers", CRUD),
    ("rbac", CRUD),
    ("shared_access_keys", &[Action::Read, Action::Update]),
    ("users", CRUD),
];

fn dataset_lists(c: &DatasetCapabilities) -> [&Vec<Action>; 7] {
    [
        &c.ingest,
        &c.query,
        &c.starred_queries,
        &c.virtual_fields,
        &c.data,
        &c.trim,
        &c.vacuum,
    ]
}

fn dataset_lists_mut(c: &mut DatasetCapabilities) -> [&mut Vec<Action>; 7] {
    [
        &mut c.ingest,
        &mut c.query,
        &mut c.starred_queries,
        &mut c.virtual_fields,
        &mut c.data,
        &mut c.trim,
        &mut c.vacuum,
    ]
}

fn org_lists(c: &OrgCapabilities) -> [&Vec<Action>; 14] {
    [
        &c.annotations,
        &c.api_tokens,
        &c.audit_log,
        &c.billing,
        &c.dashboards,
        &c.datasets,
        &c.endpoints,
        &c.flows,
        &c.integrations,
        &c.monitors,
        &c.notifiers,
        &c.rbac,
        &c.shared_access_keys,
        &c.users,
    ]
}

fn org_lists_mut(c: &mut OrgCapabilities) -> [&mut Vec<Action>; 14] {
    [
        &mut c.annotations,
        &mut c.api_tokens,
        &mut c.audit_log,
        &mut c.billing,
        &mut c.dashboards,
        &mut c.datasets,
        &mut c.endpoints,
        &mut c.flows,
        &mut c.integrations,
        &mut c.monitors,
        &mut c.notifiers,
        &mut c.rbac,
        &mut c.shared_access_keys,
        &mut c.users,
    ]
}

/// Handler for `axiom_token`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenResource;

fn capability_block(table: &[(&str, &[Action])]) -> Block {
    table.iter().fold(Block::new(), |block, (name, allowed)| {
        block.with_attribute(
            *name,
            Attribute::string_list(AttributeFlags::optional())
                .with_validator(Validator::each_one_of(allowed.iter().map(|a| a.to_string()))),
        )
    })
}

/// Attribute schema of `axiom_token`.
pub fn schema() -> Schema {
    Schema::new(SCHEMA_VERSION)
        .with_attribute("id", Attribute::computed_string().with_description("Token identifier"))
        .with_attribute(
            "token",
            Attribute::computed_string()
                .sensitive()
                .with_description("The secret, only known after creation"),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_force_new()
                .with_description("Token name"),
        )
        .with_attribute(
            "description",
            Attribute::optional_string().with_force_new(),
        )
        .with_attribute(
            "expires_at",
            Attribute::optional_string()
                .with_force_new()
                .with_validator(Validator::Rfc3339)
                .with_description("RFC3339 expiry; the token never expires when unset"),
        )
        .with_block(
            "dataset_capabilities",
            NestedBlock::map(capability_block(&DATASET_CAPABILITIES)).with_force_new(),
        )
        .with_block(
            "org_capabilities",
            NestedBlock::single(capability_block(&ORG_CAPABILITIES)).with_force_new(),
        )
}

fn extract_actions(
    obj: &Map<String, Value>,
    name: &str,
    allowed: &[Action],
    path: &str,
) -> Result<Vec<Action>, Diagnostics> {
    let path = format!("{path}.{name}");
    let raw: Vec<String> = match obj.get(name).filter(|v| !v.is_null()) {
        None => return Ok(Vec::new()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| conversion_error(&path, e))?
        }
    };

    let mut actions = Vec::with_capacity(raw.len());
    let mut diags = Diagnostics::new();
    for item in raw {
        match Action::from_str(&item) {
            Ok(action) if allowed.contains(&action) => actions.push(action),
            Ok(_) => diags.push(
                validation_error(
                    format!("Invalid value for attribute '{path}'"),
                    format!("Action '{item}' is not allowed here"),
                )
                .with_attribute(&path),
            ),
            Err(_) => diags.push(conversion_error(&path, format!("unknown action '{item}'"))),
        }
    }
    diags.into_result()?;
    Ok(actions)
}

fn extract_dataset_capabilities(
    plan: &PlanState,
) -> Result<BTreeMap<String, DatasetCapabilities>, Diagnostics> {
    let Some(raw) = plan.get::<BTreeMap<String, Map<String, Value>>>("dataset_capabilities")?
    else {
        return Ok(BTreeMap::new());
    };

    let mut out = BTreeMap::new();
    for (dataset, obj) in raw {
        let path = format!("dataset_capabilities.{dataset}");
        let mut caps = DatasetCapabilities::default();
        for ((name, allowed), slot) in DATASET_CAPABILITIES
            .iter()
            .zip(dataset_lists_mut(&mut caps))
        {
            *slot = extract_actions(&obj, name, allowed, &path)?;
        }
        out.insert(dataset, caps);
    }
    Ok(out)
}

fn extract_org_capabilities(plan: &PlanState) -> Result<OrgCapabilities, Diagnostics> {
    let mut caps = OrgCapabilities::default();
    let Some(obj) = plan.get::<Map<String, Value>>("org_capabilities")? else {
        return Ok(caps);
    };
    for ((name, allowed), slot) in ORG_CAPABILITIES.iter().zip(org_lists_mut(&mut caps)) {
        *slot = extract_actions(&obj, name, allowed, "org_capabilities")?;
    }
    Ok(caps)
}

/// Build the token described by `plan`. The secret is never part of it.
pub fn extract(plan: &PlanState) -> Result<ApiToken, Diagnostics> {
    let expires_at = match plan.get::<String>("expires_at")? {
        None => None,
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| {
                    Diagnostics::from(
                        validation_error("Invalid expires at", format!("{raw}: {e}"))
                            .with_attribute("expires_at"),
                    )
                })?
                .with_timezone(&Utc),
        ),
    };

    Ok(ApiToken {
        id: plan.id().unwrap_or_default().to_string(),
        name: plan.require("name")?,
        description: plan.get("description")?.unwrap_or_default(),
        expires_at,
        dataset_capabilities: extract_dataset_capabilities(plan)?,
        org_capabilities: extract_org_capabilities(plan)?,
    })
}

impl From<&ApiToken> for CreateTokenRequest {
    fn from(token: &ApiToken) -> Self {
        Self {
            name: token.name.clone(),
            description: token.description.clone(),
            expires_at: token.expires_at,
            dataset_capabilities: token.dataset_capabilities.clone(),
            org_capabilities: token.org_capabilities.clone(),
        }
    }
}

fn flatten_lists<'a>(
    table: &[(&str, &[Action])],
    lists: impl IntoIterator<Item = &'a Vec<Action>>,
) -> Value {
    table
        .iter()
        .zip(lists)
        .map(|((name, _), actions)| (name.to_string(), non_empty_list(actions)))
        .collect::<Map<_, _>>()
        .into()
}

/// Flatten token metadata. `token` is left `null`.
///
/// Org capabilities always flatten to an object; with no grants every list in
/// it is `null`. An empty dataset capability map flattens to `null`.
pub fn flatten(token: &ApiToken) -> PlanState {
    let dataset_capabilities = if token.dataset_capabilities.is_empty() {
        Value::Null
    } else {
        token
            .dataset_capabilities
            .iter()
            .map(|(dataset, caps)| {
                (
                    dataset.clone(),
                    flatten_lists(&DATASET_CAPABILITIES, dataset_lists(caps)),
                )
            })
            .collect::<Map<_, _>>()
            .into()
    };

    PlanState::new()
        .with("id", token.id.as_str())
        .with("token", Value::Null)
        .with("name", token.name.as_str())
        .with("description", non_empty(&token.description))
        .with(
            "expires_at",
            token
                .expires_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        )
        .with("dataset_capabilities", dataset_capabilities)
        .with(
            "org_capabilities",
            flatten_lists(&ORG_CAPABILITIES, org_lists(&token.org_capabilities)),
        )
}

/// Flatten a create response, capturing the secret.
pub fn flatten_created(created: &CreatedToken) -> PlanState {
    flatten(&created.info).with("token", created.token.as_str())
}

fn update_not_supported() -> Diagnostic {
    Diagnostic::error("Update not supported")
        .with_detail("tokens cannot be updated, must be destroyed and recreated")
        .with_category(DiagnosticCategory::Validation)
}

#[async_trait]
impl Resource for TokenResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Token
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
            .create_token(&CreateTokenRequest::from(&desired))
            .await
            .map_err(|e| create_failed(self.kind(), &e))?;
        Ok(flatten_created(&created))
    }

    async fn read(
        &self,
        client: &dyn AxiomApi,
        state: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(state)?;
        let token = client
            .get_token(&id)
            .await
            .map_err(|e| read_failed(self.kind(), &e))?;
        Ok(flatten(&token).with("token", state.raw("token").cloned()))
    }

    async fn update(
        &self,
        _client: &dyn AxiomApi,
        _prior: &PlanState,
        _plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        Err(update_not_supported().into())
    }

    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics> {
        let id = require_id(state)?;
        client
            .delete_token(&id)
            .await
            .map_err(|e| delete_failed(self.kind(), &e))
    }

    fn immutable(&self) -> Option<Diagnostic> {
        Some(update_not_supported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Reconciler, Transition};
    use crate::testing::FakeAxiom;
    use crate::validation::validate;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn ci_token() -> ApiToken {
        ApiToken {
            id: "tok_1".to_string(),
            name: "ci".to_string(),
            description: "CI ingest".to_string(),
            expires_at: Some(Utc.with_ymd_and_hms(2031, 6, 30, 0, 0, 0).unwrap()),
            dataset_capabilities: BTreeMap::from([(
                "logs".to_string(),
                DatasetCapabilities {
                    ingest: vec![Action::Create],
                    query: vec![Action::Read],
                    starred_queries: vec![Action::Read, Action::Update],
                    ..Default::default()
                },
            )]),
            org_capabilities: OrgCapabilities {
                monitors: vec![Action::Read],
                billing: vec![Action::Read, Action::Update],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_round_trip() {
        let token = ci_token();
        assert_eq!(extract(&flatten(&token)).unwrap(), token);

        let bare = ApiToken {
            id: "tok_2".to_string(),
            name: "empty".to_string(),
            ..Default::default()
        };
        assert_eq!(extract(&flatten(&bare)).unwrap(), bare);
    }

    #[test]
    fn test_flatten_empty_capabilities() {
        let state = flatten(&ApiToken {
            id: "tok_2".to_string(),
            name: "empty".to_string(),
            ..Default::default()
        });
        assert!(state.is_null("dataset_capabilities"));
        assert!(state.is_null("description"));
        assert!(state.is_null("expires_at"));

        let org = state.raw("org_capabilities").unwrap().as_object().unwrap();
        assert_eq!(org.len(), ORG_CAPABILITIES.len());
        assert!(org.values().all(Value::is_null));
    }

    #[test]
    fn test_flatten_lists() {
        let state = flatten(&ci_token());
        assert_eq!(
            state.raw("dataset_capabilities").unwrap()["logs"],
            json!({
                "ingest": ["create"],
                "query": ["read"],
                "starred_queries": ["read", "update"],
                "virtual_fields": null,
                "data": null,
                "trim": null,
                "vacuum": null
            })
        );
        assert_eq!(
            state.raw("expires_at"),
            Some(&json!("2031-06-30T00:00:00Z"))
        );
    }

    #[test]
    fn test_expires_at_converted_to_utc() {
        let plan = flatten(&ci_token()).with("expires_at", "2031-06-30T02:00:00+02:00");
        let token = extract(&plan).unwrap();
        assert_eq!(token.expires_at, ci_token().expires_at);
    }

    #[test]
    fn test_extract_rejects_bad_actions() {
        let plan = PlanState::new()
            .with("name", "ci")
            .with("org_capabilities", json!({"audit_log": ["delete"]}));
        let err = extract(&plan).unwrap_err();
        assert_eq!(err[0].attribute.as_deref(), Some("org_capabilities.audit_log"));
        assert_eq!(err[0].category, Some(DiagnosticCategory::Validation));

        let plan = PlanState::new().with("name", "ci").with(
            "dataset_capabilities",
            json!({"logs": {"query": ["write"]}}),
        );
        let err = extract(&plan).unwrap_err();
        assert_eq!(
            err[0].attribute.as_deref(),
            Some("dataset_capabilities.logs.query")
        );
        assert_eq!(err[0].category, Some(DiagnosticCategory::Conversion));
    }

    #[test]
    fn test_schema_validates_capabilities() {
        let schema = schema();
        let diags = validate(
            &schema,
            &json!({
                "name": "ci",
                "dataset_capabilities": {"logs": {"ingest": ["read"]}}
            }),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_deref(),
            Some("dataset_capabilities.logs.ingest.0")
        );

        let mut paths = schema.force_new_paths();
        paths.sort_unstable();
        assert_eq!(
            paths,
            vec![
                "dataset_capabilities",
                "description",
                "expires_at",
                "name",
                "org_capabilities"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_captures_secret_and_read_keeps_it() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let plan = flatten(&ci_token()).with("id", Value::Null);

        let Transition::Persist(state) = reconciler.create(&TokenResource, &plan).await.transition
        else {
            panic!("expected persisted state");
        };
        let secret = state.raw("token").and_then(Value::as_str).unwrap().to_string();
        assert!(secret.starts_with("xaat-"));

        let Transition::Persist(refreshed) = reconciler.read(&TokenResource, &state).await.transition
        else {
            panic!("expected persisted state");
        };
        assert_eq!(refreshed.raw("token"), Some(&json!(secret)));
        assert_eq!(refreshed, state);
    }
}
