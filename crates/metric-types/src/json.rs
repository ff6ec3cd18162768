//! JSON payload parser.
//!
//! A payload is either one metric object or an array of them:
//!
//! ```json
//! {"name": "cpu", "fields": {"usage": 10}, "tags": {"host": "a"}, "timestamp": "2024-01-01T00:00:00Z"}
//! ```
//!
//! `tags` and `timestamp` are optional. A timestamp is either an RFC 3339
//! string or integer seconds since the Unix epoch; when absent the time of
//! parsing is used.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{ParseError, Result};
use crate::metric::{FieldValue, Fields, Metric, Tags};
use crate::parser::Parser;

#[derive(Debug, Default, Clone)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for JsonParser {
    fn parse(&self, payload: &[u8]) -> Result<Vec<Metric>> {
        let value: Value = serde_json::from_slice(payload)?;
        let now = Utc::now();
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| metric_from_value(item, now))
                .collect(),
            other => Ok(vec![metric_from_value(other, now)?]),
        }
    }
}

fn metric_from_value(value: Value, now: DateTime<Utc>) -> Result<Metric> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ParseError::InvalidField {
                field: "metric".to_string(),
                message: format!("expected a JSON object, got {other}"),
            })
        }
    };

    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        Some(other) => {
            return Err(ParseError::InvalidField {
                field: "name".to_string(),
                message: format!("expected a non-empty string, got {other}"),
            })
        }
        None => return Err(ParseError::MissingField("name".to_string())),
    };

    let fields = match object.remove("fields") {
        Some(Value::Object(map)) => parse_fields(map)?,
        Some(other) => {
            return Err(ParseError::InvalidField {
                field: "fields".to_string(),
                message: format!("expected an object, got {other}"),
            })
        }
        None => return Err(ParseError::MissingField("fields".to_string())),
    };
    if fields.is_empty() {
        return Err(ParseError::NoFields(name));
    }

    let tags = match object.remove("tags") {
        Some(Value::Object(map)) => parse_tags(map)?,
        Some(Value::Null) | None => Tags::new(),
        Some(other) => {
            return Err(ParseError::InvalidField {
                field: "tags".to_string(),
                message: format!("expected an object, got {other}"),
            })
        }
    };

    let timestamp = match object.remove("timestamp") {
        Some(Value::Null) | None => now,
        Some(value) => parse_timestamp(value)?,
    };

    Ok(Metric::new(name, fields, tags, timestamp))
}

fn parse_fields(map: Map<String, Value>) -> Result<Fields> {
    map.into_iter()
        .map(|(key, value)| -> Result<(String, FieldValue)> {
            let value = field_value(&key, value)?;
            Ok((key, value))
        })
        .collect()
}

fn field_value(key: &str, value: Value) -> Result<FieldValue> {
    match value {
        Value::Bool(b) => Ok(FieldValue::Boolean(b)),
        Value::String(s) => Ok(FieldValue::String(s)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else if let Some(u) = n.as_u64() {
                Ok(FieldValue::UInteger(u))
            } else if let Some(f) = n.as_f64() {
                Ok(FieldValue::Float(f))
            } else {
                Err(ParseError::InvalidField {
                    field: key.to_string(),
                    message: format!("unrepresentable number {n}"),
                })
            }
        }
        other => Err(ParseError::InvalidField {
            field: key.to_string(),
            message: format!("unsupported field value {other}"),
        }),
    }
}

fn parse_tags(map: Map<String, Value>) -> Result<Tags> {
    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            other => Err(ParseError::InvalidField {
                field: key,
                message: format!("tag values must be strings, got {other}"),
            }),
        })
        .collect()
}

fn parse_timestamp(value: Value) -> Result<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ParseError::InvalidTimestamp(format!("{s}: {e}"))),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| ParseError::InvalidTimestamp(n.to_string())),
        other => Err(ParseError::InvalidTimestamp(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_metric() {
        let payload = br#"{"name": "cpu", "fields": {"usage": 10}, "tags": {"host": "a"}, "timestamp": "2024-06-15T10:30:00Z"}"#;
        let metrics = JsonParser::new().parse(payload).unwrap();

        assert_eq!(metrics.len(), 1);
        let metric = &metrics[0];
        assert_eq!(metric.name, "cpu");
        assert_eq!(metric.fields["usage"], FieldValue::Integer(10));
        assert_eq!(metric.tags["host"], "a");
        assert_eq!(metric.timestamp.to_rfc3339(), "2024-06-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_array_keeps_order() {
        let payload = br#"[
            {"name": "cpu", "fields": {"usage": 0.5}},
            {"name": "mem", "fields": {"free": 18446744073709551615, "ok": true, "state": "up"}}
        ]"#;
        let metrics = JsonParser::new().parse(payload).unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name, "cpu");
        assert_eq!(metrics[0].fields["usage"], FieldValue::Float(0.5));
        assert!(metrics[0].tags.is_empty());
        assert_eq!(metrics[1].fields["free"], FieldValue::UInteger(u64::MAX));
        assert_eq!(metrics[1].fields["ok"], FieldValue::Boolean(true));
        assert_eq!(metrics[1].fields["state"], FieldValue::from("up"));
    }

    #[test]
    fn test_parse_empty_array() {
        let metrics = JsonParser::new().parse(b"[]").unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_parse_epoch_seconds_timestamp() {
        let payload = br#"{"name": "disk", "fields": {"used": 1}, "timestamp": 1718451045}"#;
        let metrics = JsonParser::new().parse(payload).unwrap();
        assert_eq!(metrics[0].timestamp.timestamp(), 1718451045);
    }

    #[test]
    fn test_parse_garbage_is_json_error() {
        let err = JsonParser::new().parse(b"\x00\xffnot json").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_parse_missing_name() {
        let err = JsonParser::new()
            .parse(br#"{"fields": {"a": 1}}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingField(f) if f == "name"));
    }

    #[test]
    fn test_parse_empty_fields() {
        let err = JsonParser::new()
            .parse(br#"{"name": "cpu", "fields": {}}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::NoFields(n) if n == "cpu"));
    }

    #[test]
    fn test_parse_nested_field_rejected() {
        let err = JsonParser::new()
            .parse(br#"{"name": "cpu", "fields": {"a": {"b": 1}}}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { field, .. } if field == "a"));
    }

    #[test]
    fn test_parse_non_string_tag_rejected() {
        let err = JsonParser::new()
            .parse(br#"{"name": "cpu", "fields": {"a": 1}, "tags": {"core": 1}}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { field, .. } if field == "core"));
    }

    #[test]
    fn test_parse_bad_timestamp() {
        let err = JsonParser::new()
            .parse(br#"{"name": "cpu", "fields": {"a": 1}, "timestamp": "yesterday"}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp(_)));
    }
}
