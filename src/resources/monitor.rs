//! `axiom_monitor`: scheduled APL queries that alert through notifiers.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use strum::IntoEnumIterator;

use super::{
    create_failed, delete_failed, non_empty, non_empty_list, read_failed, require_id,
    update_failed, Resource, ResourceKind, SCHEMA_VERSION,
};
use crate::client::models::{Monitor, MonitorType, Operator};
use crate::client::AxiomApi;
use crate::diagnostics::{conversion_error, validation_error, Diagnostics};
use crate::schema::{Attribute, AttributeFlags, Schema, Validator};
use crate::state::PlanState;

/// Handler for `axiom_monitor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorResource;

/// Attribute schema of `axiom_monitor`.
pub fn schema() -> Schema {
    let mut operators = vec![String::new()];
    operators.extend(Operator::iter().map(|o| o.to_string()));

    Schema::new(SCHEMA_VERSION)
        .with_attribute("id", Attribute::computed_string().with_description("Monitor identifier"))
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_validator(Validator::non_empty())
                .with_description("Monitor name"),
        )
        .with_attribute("description", Attribute::optional_string())
        .with_attribute(
            "apl_query",
            Attribute::required_string().with_description("The query used inside the monitor"),
        )
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_validator(Validator::one_of(MonitorType::iter().map(|t| t.to_string())))
                .with_description("Type of monitor"),
        )
        .with_attribute(
            "operator",
            Attribute::optional_computed_string()
                .with_default(json!(""))
                .with_validator(Validator::one_of(operators))
                .with_description("Operator used in monitor trigger evaluation"),
        )
        .with_attribute(
            "threshold",
            Attribute::optional_computed_float64()
                .with_default(json!(0.0))
                .with_description("The threshold where the monitor should trigger"),
        )
        .with_attribute(
            "interval_minutes",
            Attribute::optional_computed_int64()
                .with_default(json!(1))
                .with_description("How often the monitor should run"),
        )
        .with_attribute(
            "range_minutes",
            Attribute::optional_computed_int64()
                .with_default(json!(1))
                .with_description("Query time range from now"),
        )
        .with_attribute(
            "disabled_until",
            Attribute::optional_string()
                .with_validator(Validator::Rfc3339)
                .with_description("RFC3339 time until which the monitor is disabled"),
        )
        .with_attribute(
            "notifier_ids",
            Attribute::string_list(AttributeFlags::optional())
                .with_description("Notifiers to alert when the monitor triggers"),
        )
        .with_attribute("alert_on_no_data", optional_bool(false))
        .with_attribute("notify_by_group", optional_bool(false))
        .with_attribute("resolvable", optional_bool(false))
        .with_attribute("notify_every_run", optional_bool(false))
        .with_attribute("skip_resolved", optional_bool(false))
        .with_attribute(
            "second_delay",
            Attribute::optional_computed_int64()
                .with_default(json!(0))
                .with_description("Seconds to wait before evaluating"),
        )
        .with_attribute(
            "tolerance",
            Attribute::optional_computed_float64().with_default(json!(0.0)),
        )
        .with_attribute(
            "trigger_from_n_runs",
            Attribute::optional_computed_int64().with_default(json!(1)),
        )
        .with_attribute(
            "trigger_after_n_positive_results",
            Attribute::optional_computed_int64().with_default(json!(0)),
        )
        .with_attribute(
            "compare_days",
            Attribute::optional_computed_int64()
                .with_default(json!(0))
                .with_description("Days of history compared by anomaly detection"),
        )
        .with_attribute("created_by", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
}

fn optional_bool(default: bool) -> Attribute {
    Attribute::optional_computed_bool().with_default(json!(default))
}

fn parse_type(raw: &str) -> Result<MonitorType, Diagnostics> {
    MonitorType::from_str(raw).map_err(|_| {
        validation_error(
            "Invalid monitor type",
            format!(
                "Monitor type must be one of: Threshold, MatchEvent, AnomalyDetection. Got: {}",
                raw
            ),
        )
        .with_attribute("type")
        .into()
    })
}

/// `""` means no operator.
fn parse_operator(raw: &str) -> Result<Option<Operator>, Diagnostics> {
    if raw.is_empty() {
        return Ok(None);
    }
    Operator::from_str(raw)
        .map(Some)
        .map_err(|_| conversion_error("operator", format!("unknown operator '{raw}'")).into())
}

fn parse_timestamp(plan: &PlanState, name: &str) -> Result<Option<DateTime<Utc>>, Diagnostics> {
    match plan.get::<String>(name)? {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| {
                validation_error(format!("Invalid {}", name.replace('_', " ")), format!("{raw}: {e}"))
                    .with_attribute(name)
                    .into()
            }),
    }
}

fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

const THRESHOLD_REQUIRED: &[(&str, &str)] = &[
    ("interval_minutes", "Interval"),
    ("range_minutes", "Range"),
    ("threshold", "Threshold"),
    ("operator", "Operator"),
];

const ANOMALY_REQUIRED: &[(&str, &str)] = &[
    ("interval_minutes", "Interval"),
    ("range_minutes", "Range"),
    ("compare_days", "CompareDays"),
    ("tolerance", "Tolerance"),
    ("operator", "Operator"),
];

/// Per-type requirements. An attribute is missing only when it is null and
/// has no schema default, so the empty default operator counts as present.
pub fn check_type_requirements(plan: &PlanState) -> Diagnostics {
    missing_for_type(&schema(), plan)
}

fn missing_for_type(schema: &Schema, plan: &PlanState) -> Diagnostics {
    let mut diags = Diagnostics::new();

    let Some(raw) = plan.get::<String>("type").ok().flatten() else {
        return diags;
    };
    let monitor_type = match parse_type(&raw) {
        Ok(t) => t,
        Err(e) => return e,
    };

    let (label, required) = match monitor_type {
        MonitorType::MatchEvent => return diags,
        MonitorType::Threshold => ("threshold", THRESHOLD_REQUIRED),
        MonitorType::AnomalyDetection => ("anomaly detection", ANOMALY_REQUIRED),
    };

    for (attribute, field) in required {
        let missing = plan
            .field::<serde_json::Value>(schema, attribute)
            .is_ok_and(|value| value.is_unset());
        if missing {
            diags.push(
                validation_error(
                    format!("{field} is required"),
                    format!("{field} is required for monitor type {label}"),
                )
                .with_attribute(*attribute),
            );
        }
    }
    diags
}

/// Build the remote monitor described by `plan`.
pub fn extract(plan: &PlanState) -> Result<Monitor, Diagnostics> {
    let schema = schema();

    let monitor_type = parse_type(&plan.require::<String>("type")?)?;
    check_type_requirements(plan).into_result()?;

    let operator = parse_operator(
        &plan
            .field::<String>(&schema, "operator")?
            .unwrap_or_default(),
    )?;

    Ok(Monitor {
        id: plan.id().unwrap_or_default().to_string(),
        name: plan.require("name")?,
        description: plan.get("description")?.unwrap_or_default(),
        apl_query: plan.require("apl_query")?,
        operator,
        threshold: plan.field(&schema, "threshold")?.unwrap_or_default(),
        alert_on_no_data: plan.field(&schema, "alert_on_no_data")?.unwrap_or_default(),
        notify_by_group: plan.field(&schema, "notify_by_group")?.unwrap_or_default(),
        resolvable: plan.field(&schema, "resolvable")?.unwrap_or_default(),
        notifier_ids: plan.get("notifier_ids")?.unwrap_or_default(),
        interval_minutes: plan.field(&schema, "interval_minutes")?.unwrap_or_default(),
        range_minutes: plan.field(&schema, "range_minutes")?.unwrap_or_default(),
        disabled_until: parse_timestamp(plan, "disabled_until")?,
        second_delay: plan.field(&schema, "second_delay")?.unwrap_or_default(),
        notify_every_run: plan.field(&schema, "notify_every_run")?.unwrap_or_default(),
        skip_resolved: plan.field(&schema, "skip_resolved")?.unwrap_or_default(),
        tolerance: plan.field(&schema, "tolerance")?.unwrap_or_default(),
        trigger_from_n_runs: plan.field(&schema, "trigger_from_n_runs")?.unwrap_or_default(),
        trigger_after_n_positive_results: plan
            .field(&schema, "trigger_after_n_positive_results")?
            .unwrap_or_default(),
        compare_days: plan.field(&schema, "compare_days")?.unwrap_or_default(),
        monitor_type,
        created_by: plan.get("created_by")?.unwrap_or_default(),
        created_at: parse_timestamp(plan, "created_at")?,
    })
}

/// Flatten a remote monitor.
pub fn flatten(monitor: &Monitor) -> PlanState {
    PlanState::new()
        .with("id", monitor.id.as_str())
        .with("name", monitor.name.as_str())
        .with("description", non_empty(&monitor.description))
        .with("apl_query", monitor.apl_query.as_str())
        .with("type", monitor.monitor_type.to_string())
        .with(
            "operator",
            monitor.operator.map(|o| o.to_string()).unwrap_or_default(),
        )
        .with("threshold", monitor.threshold)
        .with("interval_minutes", monitor.interval_minutes)
        .with("range_minutes", monitor.range_minutes)
        .with(
            "disabled_until",
            monitor.disabled_until.as_ref().map(format_timestamp),
        )
        .with("notifier_ids", non_empty_list(&monitor.notifier_ids))
        .with("alert_on_no_data", monitor.alert_on_no_data)
        .with("notify_by_group", monitor.notify_by_group)
        .with("resolvable", monitor.resolvable)
        .with("notify_every_run", monitor.notify_every_run)
        .with("skip_resolved", monitor.skip_resolved)
        .with("second_delay", monitor.second_delay)
        .with("tolerance", monitor.tolerance)
        .with("trigger_from_n_runs", monitor.trigger_from_n_runs)
        .with(
            "trigger_after_n_positive_results",
            monitor.trigger_after_n_positive_results,
        )
        .with("compare_days", monitor.compare_days)
        .with("created_by", non_empty(&monitor.created_by))
        .with("created_at", monitor.created_at.as_ref().map(format_timestamp))
}

#[async_trait]
impl Resource for MonitorResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Monitor
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, config: &PlanState) -> Diagnostics {
        check_type_requirements(config)
    }

    async fn create(
        &self,
        client: &dyn AxiomApi,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let desired = extract(plan)?;
        let created = client
            .create_monitor(&desired)
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
        let monitor = client
            .get_monitor(&id)
            .await
            .map_err(|e| read_failed(self.kind(), &e))?;
        Ok(flatten(&monitor))
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
            .update_monitor(&id, &desired)
            .await
            .map_err(|e| update_failed(self.kind(), &e))?;
        Ok(flatten(&updated))
    }

    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics> {
        let id = require_id(state)?;
        client
            .delete_monitor(&id)
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
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn threshold_monitor() -> Monitor {
        Monitor {
            id: "mon_1".to_string(),
            name: "errors".to_string(),
            description: "Too many errors".to_string(),
            apl_query: "['logs'] | where level == 'error' | count".to_string(),
            operator: Some(Operator::Above),
            threshold: 1.0,
            alert_on_no_data: false,
            notify_by_group: true,
            resolvable: true,
            notifier_ids: vec!["ntf_1".to_string()],
            interval_minutes: 5,
            range_minutes: 10,
            disabled_until: Some(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()),
            second_delay: 30,
            notify_every_run: false,
            skip_resolved: true,
            tolerance: 0.0,
            trigger_from_n_runs: 2,
            trigger_after_n_positive_results: 1,
            compare_days: 0,
            monitor_type: MonitorType::Threshold,
            created_by: "ops@example.com".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_round_trip() {
        let monitor = threshold_monitor();
        assert_eq!(extract(&flatten(&monitor)).unwrap(), monitor);

        let match_event = Monitor {
            operator: None,
            disabled_until: None,
            notifier_ids: Vec::new(),
            monitor_type: MonitorType::MatchEvent,
            created_at: None,
            created_by: String::new(),
            description: String::new(),
            ..threshold_monitor()
        };
        assert_eq!(extract(&flatten(&match_event)).unwrap(), match_event);
    }

    #[test]
    fn test_flatten_formats() {
        let state = flatten(&threshold_monitor());
        assert_eq!(
            state.raw("disabled_until"),
            Some(&json!("2030-01-02T03:04:05Z"))
        );
        assert_eq!(state.raw("operator"), Some(&json!("Above")));

        let state = flatten(&Monitor {
            operator: None,
            disabled_until: None,
            notifier_ids: Vec::new(),
            ..threshold_monitor()
        });
        assert_eq!(state.raw("operator"), Some(&json!("")));
        assert!(state.is_null("disabled_until"));
        assert!(state.is_null("notifier_ids"));
    }

    #[test]
    fn test_disabled_until_normalized_to_utc() {
        let plan = flatten(&threshold_monitor()).with("disabled_until", "2030-01-02T05:04:05+02:00");
        let monitor = extract(&plan).unwrap();
        assert_eq!(
            flatten(&monitor).raw("disabled_until"),
            Some(&json!("2030-01-02T03:04:05Z"))
        );

        let plan = flatten(&threshold_monitor()).with("disabled_until", "tomorrow");
        let err = extract(&plan).unwrap_err();
        assert_eq!(err[0].summary, "Invalid disabled until");
        assert_eq!(err[0].category, Some(DiagnosticCategory::Validation));
    }

    #[test]
    fn test_invalid_type() {
        let plan = flatten(&threshold_monitor()).with("type", "Heartbeat");
        let err = extract(&plan).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].summary, "Invalid monitor type");
        assert_eq!(
            err[0].detail.as_deref(),
            Some("Monitor type must be one of: Threshold, MatchEvent, AnomalyDetection. Got: Heartbeat")
        );
    }

    #[test]
    fn test_threshold_defaults_satisfy_requirements() {
        let plan = PlanState::new()
            .with("name", "errors")
            .with("apl_query", "['logs'] | count")
            .with("type", "Threshold");

        assert!(check_type_requirements(&plan).is_empty());
        let monitor = extract(&plan).unwrap();
        assert_eq!(monitor.operator, None);
        assert_eq!(monitor.threshold, 0.0);
    }

    #[test]
    fn test_anomaly_detection_accepts_empty_operator() {
        let plan = PlanState::new()
            .with("name", "latency")
            .with("apl_query", "['traces'] | summarize avg(duration)")
            .with("type", "AnomalyDetection")
            .with("operator", "");

        assert!(check_type_requirements(&plan).is_empty());
    }

    #[test]
    fn test_requirements_without_defaults() {
        let mut bare = schema();
        for attr in bare.block.attributes.values_mut() {
            attr.default = None;
        }

        let plan = PlanState::new()
            .with("name", "errors")
            .with("apl_query", "['logs'] | count")
            .with("type", "Threshold")
            .with("interval_minutes", 5)
            .with("range_minutes", 5)
            .with("threshold", 10.0);
        let diags = missing_for_type(&bare, &plan);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Operator is required");
        assert_eq!(
            diags[0].detail.as_deref(),
            Some("Operator is required for monitor type threshold")
        );
        assert!(missing_for_type(&bare, &plan.clone().with("operator", "")).is_empty());

        let anomaly = PlanState::new()
            .with("name", "latency")
            .with("apl_query", "['traces'] | summarize avg(duration)")
            .with("type", "AnomalyDetection");
        let diags = missing_for_type(&bare, &anomaly);
        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec![
                "Interval is required",
                "Range is required",
                "CompareDays is required",
                "Tolerance is required",
                "Operator is required",
            ]
        );
    }

    #[test]
    fn test_match_event_has_no_requirements() {
        let plan = PlanState::new()
            .with("name", "panic")
            .with("apl_query", "['logs'] | where msg has 'panic'")
            .with("type", "MatchEvent");
        assert!(check_type_requirements(&plan).is_empty());

        let monitor = extract(&plan).unwrap();
        assert_eq!(monitor.operator, None);
        assert_eq!(monitor.interval_minutes, 1);
        assert_eq!(monitor.range_minutes, 1);
        assert_eq!(monitor.trigger_from_n_runs, 1);
    }

    #[tokio::test]
    async fn test_request_omits_server_owned_fields() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());

        let plan = flatten(&threshold_monitor()).with("id", serde_json::Value::Null);
        let outcome = reconciler.create(&MonitorResource, &plan).await;
        assert!(!outcome.has_errors(), "{:?}", outcome);

        let body = fake.last_body("create_monitor").unwrap();
        assert_eq!(body["aplQuery"], json!("['logs'] | where level == 'error' | count"));
        assert!(body.get("createdAt").is_none());
        assert!(body.get("createdBy").is_none());
    }

    #[tokio::test]
    async fn test_update_threshold() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());

        let plan = flatten(&Monitor {
            id: String::new(),
            created_at: None,
            created_by: String::new(),
            ..threshold_monitor()
        })
        .with("id", serde_json::Value::Null);
        let Transition::Persist(prior) = reconciler.create(&MonitorResource, &plan).await.transition
        else {
            panic!("expected persisted state");
        };
        assert_eq!(prior.raw("threshold"), Some(&json!(1.0)));

        let desired = prior.clone().with("threshold", 5.0);
        let outcome = reconciler.update(&MonitorResource, &prior, &desired).await;

        let Transition::Persist(state) = outcome.transition else {
            panic!("expected persisted state, got {:?}", outcome);
        };
        assert_eq!(state.raw("threshold"), Some(&json!(5.0)));
        assert_eq!(fake.calls("update_monitor"), 1);
    }
}
