//! Plan and state snapshots exchanged with the orchestrating engine.
//!
//! A [`PlanState`] is a flat map from attribute name to JSON value. Absent and
//! `null` are the same thing: the attribute is unset. Typed access goes through
//! serde, and a value that does not fit its declared Rust type becomes a
//! conversion diagnostic naming the attribute.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::diagnostics::{conversion_error, validation_error};
use crate::schema::{Diagnostic, DiagnosticCategory, Schema};
use crate::validation::value_type_name;

/// A typed snapshot of a resource's desired or observed attribute values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanState(Map<String, Value>);

impl PlanState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value received from the engine.
    ///
    /// `null` is accepted as an empty state; anything other than an object is
    /// a conversion error.
    pub fn from_value(value: Value) -> Result<Self, Diagnostic> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(Diagnostic::error("Invalid state")
                .with_detail(format!("Expected an object, got {}", value_type_name(&other)))
                .with_category(DiagnosticCategory::Conversion)),
        }
    }

    /// Convert back into a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Borrow the raw value, treating `null` as absent.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Whether the attribute is absent or `null`.
    pub fn is_null(&self, name: &str) -> bool {
        self.raw(name).is_none()
    }

    /// The remote identifier, if known.
    pub fn id(&self) -> Option<&str> {
        self.raw("id").and_then(Value::as_str)
    }

    /// Decode an attribute into `T`; unset attributes yield `None`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, Diagnostic> {
        match self.raw(name) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| conversion_error(name, e)),
        }
    }

    /// Decode an attribute that must be set.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, Diagnostic> {
        self.get(name)?.ok_or_else(|| {
            validation_error(
                format!("Missing required attribute '{}'", name),
                "This attribute is required and must be provided",
            )
            .with_attribute(name)
        })
    }

    /// Decode an attribute as a [`Field`], consulting the schema default.
    pub fn field<T: DeserializeOwned>(
        &self,
        schema: &Schema,
        name: &str,
    ) -> Result<Field<T>, Diagnostic> {
        if let Some(value) = self.get(name)? {
            return Ok(Field::Set(value));
        }
        match schema.attribute(name).and_then(|a| a.default.as_ref()) {
            Some(default) => serde_json::from_value(default.clone())
                .map(Field::Default)
                .map_err(|e| conversion_error(name, e)),
            None => Ok(Field::Unset),
        }
    }

    /// Set an attribute. `None` becomes `null`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder form of [`PlanState::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Fill unset attributes from their schema defaults.
    pub fn apply_defaults(&mut self, schema: &Schema) {
        for (name, attr) in &schema.block.attributes {
            if let Some(default) = &attr.default {
                if self.is_null(name) {
                    self.0.insert(name.clone(), default.clone());
                }
            }
        }
    }

    /// Iterate over all attribute names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for PlanState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Tri-state view of an optional attribute.
///
/// Distinguishes a value the user wrote from one supplied by the schema
/// default, and both from an attribute that is simply absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<T> {
    /// Neither configured nor defaulted.
    Unset,
    /// Taken from the schema default.
    Default(T),
    /// Explicitly configured.
    Set(T),
}

impl<T> Field<T> {
    /// The effective value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Unset => None,
            Field::Default(v) | Field::Set(v) => Some(v),
        }
    }

    /// Consume into the effective value.
    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Unset => None,
            Field::Default(v) | Field::Set(v) => Some(v),
        }
    }

    /// Whether no effective value exists.
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    /// Whether the user wrote this value.
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    /// The effective value or `fallback`.
    pub fn unwrap_or(self, fallback: T) -> T {
        self.into_option().unwrap_or(fallback)
    }
}

impl<T: Default> Field<T> {
    /// The effective value or `T::default()`.
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}
