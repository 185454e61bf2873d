//! Remote entities as the Axiom API sends and receives them.
//!
//! Field names follow the API's camelCase JSON. Timestamps are UTC and
//! serialize as RFC3339.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ── Datasets ─────────────────────────────────────────────────────────

/// Storage kind of a dataset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
pub enum DatasetKind {
    /// Event data.
    #[default]
    #[serde(rename = "axiom:events:v1")]
    #[strum(serialize = "axiom:events:v1")]
    Events,
    /// OpenTelemetry metrics.
    #[serde(rename = "otel:metrics:v1")]
    #[strum(serialize = "otel:metrics:v1")]
    OtelMetrics,
    /// OpenTelemetry traces.
    #[serde(rename = "otel:traces:v1")]
    #[strum(serialize = "otel:traces:v1")]
    OtelTraces,
    /// OpenTelemetry logs.
    #[serde(rename = "otel:logs:v1")]
    #[strum(serialize = "otel:logs:v1")]
    OtelLogs,
}

/// A dataset as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Server-assigned identifier.
    #[serde(default)]
    pub id: String,
    /// Unique dataset name.
    pub name: String,
    /// Storage kind.
    #[serde(default)]
    pub kind: DatasetKind,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Whether `retention_days` applies.
    #[serde(default)]
    pub use_retention_period: bool,
    /// Days data is kept when retention is enabled.
    #[serde(default)]
    pub retention_days: i64,
    /// Fields stored as maps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map_fields: Vec<String>,
    /// Fields stored as objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_fields: Vec<String>,
}

/// Body of `POST /v2/datasets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCreateRequest {
    /// Unique dataset name.
    pub name: String,
    /// Storage kind.
    pub kind: DatasetKind,
    /// Free-form description.
    pub description: String,
    /// Whether `retention_days` applies.
    pub use_retention_period: bool,
    /// Days data is kept; zero when retention is off.
    pub retention_days: i64,
    /// Fields stored as objects.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub object_fields: Vec<String>,
}

/// Body of `PUT /v2/datasets/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetUpdateRequest {
    /// Free-form description.
    pub description: String,
    /// Whether `retention_days` applies.
    pub use_retention_period: bool,
    /// Days data is kept; zero when retention is off.
    pub retention_days: i64,
    /// Fields stored as objects.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub object_fields: Vec<String>,
}

// ── Monitors ─────────────────────────────────────────────────────────

/// Comparison applied to a monitor's query result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Operator {
    /// Fires when the result is below the threshold.
    Below,
    /// Fires at or below the threshold.
    BelowOrEqual,
    /// Fires when the result is above the threshold.
    Above,
    /// Fires at or above the threshold.
    AboveOrEqual,
}

/// How a monitor decides to fire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum MonitorType {
    /// Compares a query result with a fixed threshold.
    Threshold,
    /// Fires on every matching event.
    MatchEvent,
    /// Compares against the same window on previous days.
    AnomalyDetection,
}

/// A monitor, used for both requests and responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// APL query evaluated on every run.
    #[serde(rename = "aplQuery")]
    pub apl_query: String,
    /// Comparison for threshold and anomaly monitors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Value the query result is compared with.
    #[serde(default)]
    pub threshold: f64,
    /// Fire when the query returns no data.
    #[serde(default)]
    pub alert_on_no_data: bool,
    /// Notify once per group instead of once per monitor.
    #[serde(default)]
    pub notify_by_group: bool,
    /// Whether alerts can be resolved.
    #[serde(default)]
    pub resolvable: bool,
    /// Notifiers to alert.
    #[serde(default)]
    pub notifier_ids: Vec<String>,
    /// Minutes between runs.
    #[serde(default)]
    pub interval_minutes: i64,
    /// Query window in minutes.
    #[serde(default)]
    pub range_minutes: i64,
    /// The monitor is paused until this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_until: Option<DateTime<Utc>>,
    /// Delay before evaluation, in seconds.
    #[serde(default)]
    pub second_delay: i64,
    /// Notify on every firing run, not only on state change.
    #[serde(default)]
    pub notify_every_run: bool,
    /// Skip resolved notifications.
    #[serde(default)]
    pub skip_resolved: bool,
    /// Allowed deviation for anomaly detection, in percent.
    #[serde(default)]
    pub tolerance: f64,
    /// Consecutive firing runs required.
    #[serde(default)]
    pub trigger_from_n_runs: i64,
    /// Positive results required before firing.
    #[serde(default)]
    pub trigger_after_n_positive_results: i64,
    /// Days of history anomaly detection compares with.
    #[serde(default)]
    pub compare_days: i64,
    /// How the monitor decides to fire.
    #[serde(rename = "type")]
    pub monitor_type: MonitorType,
    /// Server-owned; read from responses, never sent.
    #[serde(default, skip_serializing)]
    pub created_by: String,
    /// Server-owned; read from responses, never sent.
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Notifiers ────────────────────────────────────────────────────────

/// A notifier and its single delivery channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notifier {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// The delivery channel.
    pub properties: NotifierChannel,
}

/// Exactly one delivery channel; encoded as `{"<channel>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotifierChannel {
    /// Slack incoming webhook.
    Slack(SlackConfig),
    /// Discord bot channel.
    Discord(DiscordConfig),
    /// Discord webhook.
    DiscordWebhook(DiscordWebhookConfig),
    /// Email recipients.
    Email(EmailConfig),
    /// Opsgenie integration.
    Opsgenie(OpsgenieConfig),
    /// PagerDuty Events integration.
    Pagerduty(PagerdutyConfig),
    /// Plain webhook.
    Webhook(WebhookConfig),
    /// Webhook with a templated body and headers.
    CustomWebhook(CustomWebhookConfig),
}

/// Slack channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Incoming webhook URL.
    pub slack_url: String,
}

/// Discord bot channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Channel id.
    pub discord_channel: String,
    /// Bot token.
    pub discord_token: String,
}

/// Discord webhook settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordWebhookConfig {
    /// Webhook URL.
    pub discord_webhook_url: String,
}

/// Email channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Recipient addresses.
    #[serde(default)]
    pub emails: Vec<String>,
}

/// Opsgenie channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsgenieConfig {
    /// Integration API key.
    pub api_key: String,
    /// Use the EU instance.
    #[serde(default, rename = "isEU")]
    pub is_eu: bool,
}

/// PagerDuty channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagerdutyConfig {
    /// Integration routing key.
    pub routing_key: String,
    /// Optional REST API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Plain webhook settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL.
    pub url: String,
}

/// Custom webhook settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomWebhookConfig {
    /// Target URL.
    pub url: String,
    /// Body template.
    #[serde(default)]
    pub body: String,
    /// Extra request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

// ── Tokens ───────────────────────────────────────────────────────────

/// A capability verb granted to a token.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Create entities.
    Create,
    /// Read entities.
    Read,
    /// Update entities.
    Update,
    /// Delete entities.
    Delete,
}

/// Capabilities a token holds on one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCapabilities {
    /// Allowed actions on ingest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingest: Vec<Action>,
    /// Allowed actions on query.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<Action>,
    /// Allowed actions on starred queries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub starred_queries: Vec<Action>,
    /// Allowed actions on virtual fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_fields: Vec<Action>,
    /// Allowed actions on data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Action>,
    /// Allowed actions on trim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trim: Vec<Action>,
    /// Allowed actions on vacuum.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vacuum: Vec<Action>,
}

/// Organisation-wide capabilities of a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgCapabilities {
    /// Allowed actions on annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Action>,
    /// Allowed actions on api tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_tokens: Vec<Action>,
    /// Allowed actions on audit log.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit_log: Vec<Action>,
    /// Allowed actions on billing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub billing: Vec<Action>,
    /// Allowed actions on dashboards.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dashboards: Vec<Action>,
    /// Allowed actions on datasets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<Action>,
    /// Allowed actions on endpoints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Action>,
    /// Allowed actions on flows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Action>,
    /// Allowed actions on integrations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<Action>,
    /// Allowed actions on monitors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitors: Vec<Action>,
    /// Allowed actions on notifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifiers: Vec<Action>,
    /// Allowed actions on rbac.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rbac: Vec<Action>,
    /// Allowed actions on shared access keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_access_keys: Vec<Action>,
    /// Allowed actions on users.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Action>,
}

/// Body of `POST /v2/tokens`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Expiry; `None` never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Per-dataset capabilities, keyed by dataset name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dataset_capabilities: BTreeMap<String, DatasetCapabilities>,
    /// Organisation-wide capabilities.
    pub org_capabilities: OrgCapabilities,
}

/// A token's metadata. The secret value is never included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    /// Server-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Expiry; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Per-dataset capabilities, keyed by dataset name.
    #[serde(default)]
    pub dataset_capabilities: BTreeMap<String, DatasetCapabilities>,
    /// Organisation-wide capabilities.
    #[serde(default)]
    pub org_capabilities: OrgCapabilities,
}

/// Response of `POST /v2/tokens`: the metadata plus the one-time secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedToken {
    /// Token metadata.
    #[serde(flatten)]
    pub info: ApiToken,
    /// The secret, returned only once.
    pub token: String,
}

// ── Users ────────────────────────────────────────────────────────────

/// A role reference attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    /// Role identifier.
    pub id: String,
    /// Role display name.
    #[serde(default)]
    pub name: String,
}

/// An organisation member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Assigned role.
    pub role: UserRole,
}

/// Body of `POST /v2/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role identifier.
    pub role: String,
}

/// Body of `PUT /v2/users/{id}`; only the display name is mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateUserRequest {
    /// New display name.
    pub name: String,
}

// ── Virtual fields ───────────────────────────────────────────────────

/// A virtual field, used for both requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualField {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Dataset the field belongs to.
    pub dataset: String,
    /// Field name.
    pub name: String,
    /// APL expression computing the value.
    pub expression: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Declared result type.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub field_type: String,
    /// Display unit.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
}
