//! `axiom_notifier`: alert delivery channels used by monitors.
//!
//! The `properties` block holds one sub-block per channel kind. Exactly one of
//! them may be populated; the schema enforces that at validation time and
//! [`extract`] checks it again before anything is sent.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{
    create_failed, delete_failed, non_empty, non_empty_list, read_failed, require_id,
    update_failed, Resource, ResourceKind, SCHEMA_VERSION,
};
use crate::client::models::{
    CustomWebhookConfig, DiscordConfig, DiscordWebhookConfig, EmailConfig, Notifier,
    NotifierChannel, OpsgenieConfig, PagerdutyConfig, SlackConfig, WebhookConfig,
};
use crate::client::AxiomApi;
use crate::diagnostics::{validation_error, Diagnostics};
use crate::schema::{
    Attribute, AttributeFlags, Block, Constraint, NestedBlock, Schema, Validator,
};
use crate::state::PlanState;

/// Channel sub-block names, in schema order.
pub const CHANNELS: [&str; 8] = [
    "slack",
    "discord",
    "discord_webhook",
    "email",
    "opsgenie",
    "pagerduty",
    "webhook",
    "custom_webhook",
];

/// Handler for `axiom_notifier`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifierResource;

/// Attribute schema of `axiom_notifier`.
pub fn schema() -> Schema {
    let properties = Block::new()
        .with_description("The properties of the notifier")
        .with_block(
            "slack",
            channel(Block::new().with_attribute(
                "slack_url",
                Attribute::required_string().with_description("The slack URL"),
            )),
        )
        .with_block(
            "discord",
            channel(
                Block::new()
                    .with_attribute("discord_channel", Attribute::required_string())
                    .with_attribute("discord_token", Attribute::required_string().sensitive()),
            ),
        )
        .with_block(
            "discord_webhook",
            channel(Block::new().with_attribute("discord_webhook_url", Attribute::required_string())),
        )
        .with_block(
            "email",
            channel(Block::new().with_attribute(
                "emails",
                Attribute::string_list(AttributeFlags::required())
                    .with_description("The emails to be notified"),
            )),
        )
        .with_block(
            "opsgenie",
            channel(
                Block::new()
                    .with_attribute("api_key", Attribute::required_string().sensitive())
                    .with_attribute("is_eu", Attribute::optional_bool()),
            ),
        )
        .with_block(
            "pagerduty",
            channel(
                Block::new()
                    .with_attribute("routing_key", Attribute::required_string().sensitive())
                    .with_attribute(
                        "token",
                        Attribute::optional_string()
                            .sensitive()
                            .with_description("Deprecated; ignored by the API"),
                    ),
            ),
        )
        .with_block(
            "webhook",
            channel(Block::new().with_attribute("url", Attribute::required_string())),
        )
        .with_block(
            "custom_webhook",
            channel(
                Block::new()
                    .with_attribute("url", Attribute::required_string())
                    .with_attribute("body", Attribute::optional_string())
                    .with_attribute(
                        "headers",
                        Attribute::string_map(AttributeFlags::optional()).sensitive(),
                    ),
            ),
        )
        .with_constraint(Constraint::exactly_one_of(CHANNELS));

    Schema::new(SCHEMA_VERSION)
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Notifier identifier"),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_validator(Validator::non_empty())
                .with_description("Notifier name"),
        )
        .with_block("properties", NestedBlock::single(properties).required())
}

fn channel(block: Block) -> NestedBlock {
    NestedBlock::single(block)
}

/// Prefix every attribute path with `prefix`.
fn under(prefix: &str, diags: impl Into<Diagnostics>) -> Diagnostics {
    diags
        .into()
        .into_iter()
        .map(|mut d| {
            d.attribute = Some(match d.attribute.take() {
                Some(attr) => format!("{prefix}.{attr}"),
                None => prefix.to_string(),
            });
            d
        })
        .collect()
}

fn populated(properties: &Map<String, Value>) -> Vec<&'static str> {
    CHANNELS
        .into_iter()
        .filter(|name| properties.get(*name).is_some_and(|v| !v.is_null()))
        .collect()
}

fn extract_channel(name: &str, config: PlanState) -> Result<NotifierChannel, Diagnostics> {
    let channel = match name {
        "slack" => NotifierChannel::Slack(SlackConfig {
            slack_url: config.require("slack_url")?,
        }),
        "discord" => NotifierChannel::Discord(DiscordConfig {
            discord_channel: config.require("discord_channel")?,
            discord_token: config.require("discord_token")?,
        }),
        "discord_webhook" => NotifierChannel::DiscordWebhook(DiscordWebhookConfig {
            discord_webhook_url: config.require("discord_webhook_url")?,
        }),
        "email" => NotifierChannel::Email(EmailConfig {
            emails: config.get("emails")?.unwrap_or_default(),
        }),
        "opsgenie" => NotifierChannel::Opsgenie(OpsgenieConfig {
            api_key: config.require("api_key")?,
            is_eu: config.get("is_eu")?.unwrap_or_default(),
        }),
        "pagerduty" => NotifierChannel::Pagerduty(PagerdutyConfig {
            routing_key: config.require("routing_key")?,
            token: config.get("token")?,
        }),
        "webhook" => NotifierChannel::Webhook(WebhookConfig {
            url: config.require("url")?,
        }),
        "custom_webhook" => NotifierChannel::CustomWebhook(CustomWebhookConfig {
            url: config.require("url")?,
            body: config.get("body")?.unwrap_or_default(),
            headers: config
                .get::<BTreeMap<String, String>>("headers")?
                .unwrap_or_default(),
        }),
        other => {
            return Err(validation_error(
                "Invalid notifier properties",
                format!("Unknown channel '{other}'"),
            )
            .into())
        }
    };
    Ok(channel)
}

/// Build the remote notifier described by `plan`.
///
/// Zero or several populated channels are rejected before any remote call.
pub fn extract(plan: &PlanState) -> Result<Notifier, Diagnostics> {
    let name: String = plan.require("name")?;
    let properties: Map<String, Value> = plan.require("properties")?;

    let active = match populated(&properties).as_slice() {
        [one] => *one,
        [] => {
            return Err(validation_error(
                "Invalid notifier properties",
                format!("Exactly one of [{}] must be specified", CHANNELS.join(", ")),
            )
            .with_attribute("properties")
            .into())
        }
        many => {
            return Err(validation_error(
                "Invalid notifier properties",
                format!(
                    "Exactly one of [{}] must be specified, got [{}]",
                    CHANNELS.join(", "),
                    many.join(", ")
                ),
            )
            .with_attribute("properties")
            .into())
        }
    };

    let path = format!("properties.{active}");
    let config = properties
        .get(active)
        .cloned()
        .map(PlanState::from_value)
        .transpose()
        .map_err(|d| under(&path, d))?
        .unwrap_or_default();
    let channel = extract_channel(active, config).map_err(|d| under(&path, d))?;

    Ok(Notifier {
        id: plan.id().unwrap_or_default().to_string(),
        name,
        properties: channel,
    })
}

/// Name of the sub-block that carries `channel`.
pub fn channel_name(channel: &NotifierChannel) -> &'static str {
    match channel {
        NotifierChannel::Slack(_) => "slack",
        NotifierChannel::Discord(_) => "discord",
        NotifierChannel::DiscordWebhook(_) => "discord_webhook",
        NotifierChannel::Email(_) => "email",
        NotifierChannel::Opsgenie(_) => "opsgenie",
        NotifierChannel::Pagerduty(_) => "pagerduty",
        NotifierChannel::Webhook(_) => "webhook",
        NotifierChannel::CustomWebhook(_) => "custom_webhook",
    }
}

fn flatten_channel(channel: &NotifierChannel) -> PlanState {
    match channel {
        NotifierChannel::Slack(c) => PlanState::new().with("slack_url", c.slack_url.as_str()),
        NotifierChannel::Discord(c) => PlanState::new()
            .with("discord_channel", c.discord_channel.as_str())
            .with("discord_token", c.discord_token.as_str()),
        NotifierChannel::DiscordWebhook(c) => {
            PlanState::new().with("discord_webhook_url", c.discord_webhook_url.as_str())
        }
        NotifierChannel::Email(c) => PlanState::new().with("emails", non_empty_list(&c.emails)),
        NotifierChannel::Opsgenie(c) => PlanState::new()
            .with("api_key", c.api_key.as_str())
            .with("is_eu", c.is_eu),
        NotifierChannel::Pagerduty(c) => PlanState::new()
            .with("routing_key", c.routing_key.as_str())
            .with("token", c.token.clone()),
        NotifierChannel::Webhook(c) => PlanState::new().with("url", c.url.as_str()),
        NotifierChannel::CustomWebhook(c) => {
            let headers = if c.headers.is_empty() {
                Value::Null
            } else {
                c.headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect::<Map<_, _>>()
                    .into()
            };
            PlanState::new()
                .with("url", c.url.as_str())
                .with("body", non_empty(&c.body))
                .with("headers", headers)
        }
    }
}

/// Flatten a remote notifier. Inactive channels are `null`.
pub fn flatten(notifier: &Notifier) -> PlanState {
    let active = channel_name(&notifier.properties);
    let properties: Map<String, Value> = CHANNELS
        .iter()
        .map(|name| {
            let value = if *name == active {
                flatten_channel(&notifier.properties).into_value()
            } else {
                Value::Null
            };
            (name.to_string(), value)
        })
        .collect();

    PlanState::new()
        .with("id", notifier.id.as_str())
        .with("name", notifier.name.as_str())
        .with("properties", properties)
}

#[async_trait]
impl Resource for NotifierResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Notifier
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
            .create_notifier(&desired)
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
        let notifier = client
            .get_notifier(&id)
            .await
            .map_err(|e| read_failed(self.kind(), &e))?;
        Ok(flatten(&notifier))
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
            .update_notifier(&id, &desired)
            .await
            .map_err(|e| update_failed(self.kind(), &e))?;
        Ok(flatten(&updated))
    }

    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics> {
        let id = require_id(state)?;
        client
            .delete_notifier(&id)
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

    fn notifier(properties: NotifierChannel) -> Notifier {
        Notifier {
            id: "ntf_1".to_string(),
            name: "oncall".to_string(),
            properties,
        }
    }

    #[test]
    fn test_round_trip_every_channel() {
        let channels = vec![
            NotifierChannel::Slack(SlackConfig {
                slack_url: "https://hooks.slack.example/T0".to_string(),
            }),
            NotifierChannel::Discord(DiscordConfig {
                discord_channel: "alerts".to_string(),
                discord_token: "secret".to_string(),
            }),
            NotifierChannel::DiscordWebhook(DiscordWebhookConfig {
                discord_webhook_url: "https://discord.example/hook".to_string(),
            }),
            NotifierChannel::Email(EmailConfig {
                emails: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            }),
            NotifierChannel::Opsgenie(OpsgenieConfig {
                api_key: "key".to_string(),
                is_eu: true,
            }),
            NotifierChannel::Pagerduty(PagerdutyConfig {
                routing_key: "rk".to_string(),
                token: None,
            }),
            NotifierChannel::Webhook(WebhookConfig {
                url: "https://example.com/hook".to_string(),
            }),
            NotifierChannel::CustomWebhook(CustomWebhookConfig {
                url: "https://example.com/custom".to_string(),
                body: r#"{"text": "{{.Title}}"}"#.to_string(),
                headers: BTreeMap::from([("X-Key".to_string(), "v".to_string())]),
            }),
        ];

        for channel in channels {
            let original = notifier(channel);
            assert_eq!(extract(&flatten(&original)).unwrap(), original);
        }
    }

    #[test]
    fn test_flatten_nulls_inactive_channels() {
        let state = flatten(&notifier(NotifierChannel::Webhook(WebhookConfig {
            url: "https://example.com/hook".to_string(),
        })));
        let properties = state.raw("properties").unwrap();
        assert_eq!(properties["webhook"], json!({"url": "https://example.com/hook"}));
        assert_eq!(properties["slack"], Value::Null);
        assert_eq!(properties.as_object().unwrap().len(), CHANNELS.len());
    }

    #[test]
    fn test_extract_rejects_multiple_channels() {
        let plan = PlanState::new().with("name", "oncall").with(
            "properties",
            json!({
                "slack": {"slack_url": "https://hooks.slack.example/T0"},
                "email": {"emails": ["a@example.com"]}
            }),
        );
        let err = extract(&plan).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].category, Some(DiagnosticCategory::Validation));
        assert!(err[0].detail.as_deref().unwrap().ends_with("got [slack, email]"));
    }

    #[test]
    fn test_extract_rejects_no_channel() {
        let plan = PlanState::new()
            .with("name", "oncall")
            .with("properties", json!({"slack": null}));
        let err = extract(&plan).unwrap_err();
        assert_eq!(err[0].attribute.as_deref(), Some("properties"));
    }

    #[test]
    fn test_extract_prefixes_channel_paths() {
        let plan = PlanState::new()
            .with("name", "oncall")
            .with("properties", json!({"opsgenie": {"is_eu": true}}));
        let err = extract(&plan).unwrap_err();
        assert_eq!(err[0].attribute.as_deref(), Some("properties.opsgenie.api_key"));
    }

    #[test]
    fn test_schema_exactly_one_channel() {
        let schema = schema();
        let diags = validate(
            &schema,
            &json!({
                "name": "oncall",
                "properties": {
                    "slack": {"slack_url": "https://hooks.slack.example/T0"},
                    "email": {"emails": ["a@example.com"]}
                }
            }),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Invalid attribute combination");

        assert!(validate(
            &schema,
            &json!({"name": "oncall", "properties": {"webhook": {"url": "https://example.com"}}})
        )
        .is_empty());
    }

    #[tokio::test]
    async fn test_create_two_channels_makes_no_remote_call() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let plan = PlanState::new().with("name", "oncall").with(
            "properties",
            json!({
                "slack": {"slack_url": "https://hooks.slack.example/T0"},
                "email": {"emails": ["a@example.com"]}
            }),
        );

        let outcome = reconciler.create(&NotifierResource, &plan).await;

        assert_eq!(outcome.transition, Transition::Keep);
        assert_eq!(outcome.diagnostics.errors().count(), 1);
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let plan = PlanState::new().with("name", "oncall").with(
            "properties",
            json!({"email": {"emails": ["a@example.com"]}}),
        );

        let Transition::Persist(state) = reconciler.create(&NotifierResource, &plan).await.transition
        else {
            panic!("expected persisted state");
        };
        assert!(state.id().is_some());

        let outcome = reconciler.read(&NotifierResource, &state).await;
        assert_eq!(outcome.transition, Transition::Persist(state));
        let body = fake.last_body("create_notifier").unwrap();
        assert_eq!(body["properties"], json!({"email": {"emails": ["a@example.com"]}}));
    }
}
