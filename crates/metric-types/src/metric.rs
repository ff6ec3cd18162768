//! Metric types.
//!
//! A [`Metric`] is one observation: a measurement name, a non-empty set of
//! typed fields, a set of string tags, and the time it was taken.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field values a metric can carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    UInteger(u64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}i"),
            FieldValue::UInteger(v) => write!(f, "{v}u"),
            FieldValue::Boolean(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UInteger(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

/// Field set, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// Tag set, keyed by tag name.
pub type Tags = BTreeMap<String, String>;

/// A decoded metric observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Measurement name
    pub name: String,
    /// Field values (never empty for a parsed metric)
    pub fields: Fields,
    /// Tags identifying the series
    pub tags: Tags,
    /// Observation time
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        fields: Fields,
        tags: Tags,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            fields,
            tags,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Float(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Integer(10).to_string(), "10i");
        assert_eq!(FieldValue::UInteger(7).to_string(), "7u");
        assert_eq!(FieldValue::Boolean(true).to_string(), "true");
        assert_eq!(FieldValue::from("up").to_string(), "\"up\"");
    }

    #[test]
    fn test_metric_serializes_untagged_fields() {
        let mut fields = Fields::new();
        fields.insert("usage".to_string(), FieldValue::Integer(10));
        let metric = Metric::new("cpu", fields, Tags::new(), DateTime::UNIX_EPOCH);

        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["name"], "cpu");
        assert_eq!(json["fields"]["usage"], 10);
    }
}
