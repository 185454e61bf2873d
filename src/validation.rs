//! Schema validation helpers.
//!
//! This module validates a `serde_json::Value` against a [`Schema`]: presence of
//! required attributes, value types, nested blocks, per-attribute validators and
//! block-level cross-field constraints. Every failure is reported as a
//! validation diagnostic carrying the attribute path.
//!
//! # Example
//!
//! ```
//! use axiom_provider::schema::{Attribute, Schema, Validator};
//! use axiom_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::new(1)
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "operator",
//!         Attribute::optional_computed_string()
//!             .with_validator(Validator::one_of(["", "Below", "Above"])),
//!     );
//!
//! let diagnostics = validate(&schema, &json!({"name": "errors", "operator": "Above"}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "errors", "operator": "Sideways"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("operator".to_string()));
//! ```

use std::collections::HashSet;

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Constraint, Diagnostic, DiagnosticCategory,
    NestedBlock, Schema, Validator,
};

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Attribute validators run on present values
/// - Nested blocks are validated recursively
/// - Block constraints run after the block's members
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            // Null is valid for optional blocks, but we can't validate further
            return;
        },
        _ => {
            diagnostics.push(
                invalid("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }

    for constraint in &block.constraints {
        validate_constraint(block, constraint, obj, path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Provider sets these
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    invalid(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            // Validators assume a well-typed value
            if diagnostics.len() == before {
                for validator in &attr.validators {
                    validate_value(validator, v, path, diagnostics);
                }
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
    }
}

fn validate_value(
    validator: &Validator,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match validator {
        Validator::OneOf { values } => {
            if let Some(s) = value.as_str() {
                check_one_of(values, s, path, diagnostics);
            }
        },
        Validator::Matches { pattern, message } => {
            if let Some(s) = value.as_str() {
                check_matches(pattern, message, s, path, diagnostics);
            }
        },
        Validator::Rfc3339 => {
            if let Some(s) = value.as_str() {
                if let Err(e) = DateTime::parse_from_rfc3339(s) {
                    diagnostics.push(
                        invalid(format!("Invalid timestamp for attribute '{}'", path))
                            .with_detail(format!("'{}' is not an RFC3339 timestamp: {}", s, e))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::MinLength { min } => {
            if let Some(s) = value.as_str() {
                if s.chars().count() < *min {
                    diagnostics.push(
                        invalid(format!("Attribute '{}' is too short", path))
                            .with_detail(format!("Expected at least {} character(s)", min))
                            .with_attribute(path),
                    );
                }
            }
        },
        Validator::EachOneOf { values } => {
            for (i, s) in string_elements(value) {
                check_one_of(values, s, &format!("{}.{}", path, i), diagnostics);
            }
        },
        Validator::EachMatches { pattern, message } => {
            for (i, s) in string_elements(value) {
                check_matches(pattern, message, s, &format!("{}.{}", path, i), diagnostics);
            }
        },
        Validator::UniqueValues => {
            if let Some(arr) = value.as_array() {
                let mut seen = HashSet::new();
                for (i, elem) in arr.iter().enumerate() {
                    let key = elem.to_string();
                    if !seen.insert(key) {
                        diagnostics.push(
                            invalid(format!("Duplicate value in attribute '{}'", path))
                                .with_detail(format!("Element {} repeats {}", i, elem))
                                .with_attribute(path),
                        );
                    }
                }
            }
        },
    }
}

fn check_one_of(values: &[String], s: &str, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if !values.iter().any(|v| v == s) {
        let quoted: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
        diagnostics.push(
            invalid(format!("Invalid value for attribute '{}'", path))
                .with_detail(format!(
                    "Value must be one of: [{}], got: {:?}",
                    quoted.join(" "),
                    s
                ))
                .with_attribute(path),
        );
    }
}

fn check_matches(
    pattern: &str,
    message: &str,
    s: &str,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match Regex::new(pattern) {
        Ok(re) => {
            if !re.is_match(s) {
                diagnostics.push(
                    invalid(format!("Invalid value for attribute '{}'", path))
                        .with_detail(format!("{}, got: {:?}", message, s))
                        .with_attribute(path),
                );
            }
        },
        Err(e) => {
            diagnostics.push(
                invalid(format!("Invalid pattern for attribute '{}'", path))
                    .with_detail(e.to_string())
                    .with_attribute(path),
            );
        },
    }
}

fn string_elements(value: &Value) -> impl Iterator<Item = (usize, &str)> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(i, v)| v.as_str().map(|s| (i, s)))
}

fn validate_constraint(
    block: &Block,
    constraint: &Constraint,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        Constraint::ExactlyOneOf { names } => {
            let present: Vec<&str> = names
                .iter()
                .filter(|name| obj.get(name.as_str()).is_some_and(|v| !v.is_null()))
                .map(String::as_str)
                .collect();
            if present.len() != 1 {
                let detail = if present.is_empty() {
                    format!("Exactly one of [{}] must be specified", names.join(", "))
                } else {
                    format!(
                        "Exactly one of [{}] must be specified, got [{}]",
                        names.join(", "),
                        present.join(", ")
                    )
                };
                diagnostics.push(
                    invalid("Invalid attribute combination")
                        .with_detail(detail)
                        .with_attribute_if_not_empty(path),
                );
            }
        },
        Constraint::PositiveWhen {
            attribute,
            when,
            message,
        } => {
            let active = effective(block, obj, when)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !active {
                return;
            }
            let positive = effective(block, obj, attribute)
                .and_then(Value::as_f64)
                .is_some_and(|n| n > 0.0);
            if !positive {
                diagnostics.push(
                    invalid(message.clone())
                        .with_detail(format!(
                            "'{}' must be greater than 0 when '{}' is true",
                            attribute, when
                        ))
                        .with_attribute(join_path(path, attribute)),
                );
            }
        },
    }
}

/// The configured value of a block member, falling back to its default.
fn effective<'a>(
    block: &'a Block,
    obj: &'a serde_json::Map<String, Value>,
    name: &str,
) -> Option<&'a Value> {
    obj.get(name)
        .filter(|v| !v.is_null())
        .or_else(|| block.attributes.get(name).and_then(|a| a.default.as_ref()))
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    invalid(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => match nested.nesting_mode {
            BlockNestingMode::Single => validate_block(&nested.block, v, path, diagnostics),
            BlockNestingMode::Map => validate_map_block(nested, v, path, diagnostics),
        },
    }
}

fn validate_map_block(
    nested: &NestedBlock,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(obj) => {
            let len = obj.len() as u32;
            if len < nested.min_items {
                diagnostics.push(
                    invalid(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (key, item) in obj {
                let item_path = format!("{}.{}", path, key);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        v => {
            diagnostics.push(
                invalid(format!("Expected map for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

// Helper functions

fn invalid(summary: impl Into<String>) -> Diagnostic {
    Diagnostic::error(summary).with_category(DiagnosticCategory::Validation)
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                // Integral floats such as 42.0 are accepted
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    invalid(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "logs"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
        assert_eq!(diagnostics[0].category, Some(DiagnosticCategory::Validation));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema =
            Schema::v0().with_attribute("retention_days", Attribute::optional_computed_int64());

        assert!(validate(&schema, &json!({"retention_days": 30})).is_empty());
        assert!(validate(&schema, &json!({"retention_days": 30.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"retention_days": 30.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"retention_days": "30"})).len(), 1);
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = Schema::v0().with_attribute(
            "notifier_ids",
            Attribute::string_list(AttributeFlags::optional()),
        );

        assert!(validate(&schema, &json!({"notifier_ids": ["a", "b"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"notifier_ids": ["a", 2]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("notifier_ids.1".to_string()));

        let diagnostics = validate(&schema, &json!({"notifier_ids": "a"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0().with_attribute(
            "headers",
            Attribute::string_map(AttributeFlags::optional()).sensitive(),
        );

        assert!(validate(&schema, &json!({"headers": {"X-Key": "v"}})).is_empty());
        let diagnostics = validate(&schema, &json!({"headers": {"X-Key": 1}}));
        assert_eq!(diagnostics[0].attribute, Some("headers.X-Key".to_string()));
    }

    #[test]
    fn test_one_of_validator() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::required_string().with_validator(Validator::one_of([
                "Threshold",
                "AnomalyDetection",
                "MatchEvent",
            ])),
        );

        assert!(validate(&schema, &json!({"type": "MatchEvent"})).is_empty());

        let diagnostics = validate(&schema, &json!({"type": "Sometimes"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_ref()
            .unwrap()
            .contains("\"Sometimes\""));
    }

    #[test]
    fn test_validators_skip_mistyped_values() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::required_string().with_validator(Validator::one_of(["Threshold"])),
        );

        // only the type error is reported
        let diagnostics = validate(&schema, &json!({"type": 3}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_each_matches_and_unique() {
        let schema = Schema::v0().with_attribute(
            "map_fields",
            Attribute::string_list(AttributeFlags::optional_computed())
                .with_validator(Validator::each_matches(
                    r"^[a-zA-Z0-9]+([a-zA-Z0-9_.-]*[a-zA-Z0-9]+)?$",
                    "invalid map field name",
                ))
                .with_validator(Validator::UniqueValues),
        );

        assert!(validate(&schema, &json!({"map_fields": ["attributes.http", "tags"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"map_fields": ["ok", "bad-"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("map_fields.1".to_string()));

        let diagnostics = validate(&schema, &json!({"map_fields": ["tags", "tags"]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Duplicate"));
    }

    #[test]
    fn test_each_one_of() {
        let schema = Schema::v0().with_attribute(
            "ingest",
            Attribute::string_list(AttributeFlags::optional())
                .with_validator(Validator::each_one_of(["create"])),
        );

        assert!(validate(&schema, &json!({"ingest": ["create"]})).is_empty());
        let diagnostics = validate(&schema, &json!({"ingest": ["create", "delete"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("ingest.1".to_string()));
    }

    #[test]
    fn test_rfc3339_validator() {
        let schema = Schema::v0().with_attribute(
            "expires_at",
            Attribute::optional_string().with_validator(Validator::Rfc3339),
        );

        assert!(validate(&schema, &json!({"expires_at": "2030-01-02T03:04:05Z"})).is_empty());
        assert!(
            validate(&schema, &json!({"expires_at": "2030-01-02T03:04:05+02:00"})).is_empty()
        );
        assert_eq!(validate(&schema, &json!({"expires_at": "tomorrow"})).len(), 1);
    }

    #[test]
    fn test_min_length() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::MinLength { min: 1 }),
        );
        assert_eq!(validate(&schema, &json!({"name": ""})).len(), 1);
    }

    #[test]
    fn test_exactly_one_of_blocks() {
        let schema = Schema::v0().with_block(
            "properties",
            NestedBlock::single(
                Block::new()
                    .with_block(
                        "slack",
                        NestedBlock::single(
                            Block::new().with_attribute("slack_url", Attribute::required_string()),
                        ),
                    )
                    .with_block(
                        "email",
                        NestedBlock::single(Block::new().with_attribute(
                            "emails",
                            Attribute::string_list(AttributeFlags::required()),
                        )),
                    )
                    .with_constraint(Constraint::exactly_one_of(["slack", "email"])),
            )
            .required(),
        );

        let one = json!({"properties": {"slack": {"slack_url": "https://hooks"}}});
        assert!(validate(&schema, &one).is_empty());

        let two = json!({"properties": {
            "slack": {"slack_url": "https://hooks"},
            "email": {"emails": ["ops@example.com"]}
        }});
        let diagnostics = validate(&schema, &two);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("properties".to_string()));
        assert!(diagnostics[0].detail.as_ref().unwrap().contains("slack, email"));

        let none = json!({"properties": {}});
        assert_eq!(validate(&schema, &none).len(), 1);

        let missing = json!({});
        let diagnostics = validate(&schema, &missing);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Missing required block"));
    }

    #[test]
    fn test_positive_when() {
        let schema = Schema::v0()
            .with_attribute("use_retention_period", Attribute::optional_computed_bool())
            .with_attribute("retention_days", Attribute::optional_computed_int64())
            .with_constraint(Constraint::PositiveWhen {
                attribute: "retention_days".to_string(),
                when: "use_retention_period".to_string(),
                message: "Retention days must be greater than 0".to_string(),
            });

        assert!(validate(&schema, &json!({"use_retention_period": false})).is_empty());
        assert!(validate(
            &schema,
            &json!({"use_retention_period": true, "retention_days": 7})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"use_retention_period": true, "retention_days": 0}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("retention_days".to_string()));

        let diagnostics = validate(&schema, &json!({"use_retention_period": true}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_map_block() {
        let schema = Schema::v0().with_block(
            "dataset_capabilities",
            NestedBlock::map(Block::new().with_attribute(
                "query",
                Attribute::string_list(AttributeFlags::optional())
                    .with_validator(Validator::each_one_of(["read"])),
            )),
        );

        assert!(validate(
            &schema,
            &json!({"dataset_capabilities": {"logs": {"query": ["read"]}}})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"dataset_capabilities": {"logs": {"query": ["write"]}}}),
        );
        assert_eq!(
            diagnostics[0].attribute,
            Some("dataset_capabilities.logs.query.0".to_string())
        );

        let diagnostics = validate(&schema, &json!({"dataset_capabilities": ["logs"]}));
        assert!(diagnostics[0].summary.contains("Expected map"));
    }
}
