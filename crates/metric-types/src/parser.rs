//! Payload parser seam and the `data_format` registry.

use std::sync::Arc;

use crate::error::{ParseError, Result};
use crate::json::JsonParser;
use crate::metric::Metric;

/// Decodes a raw message payload into zero or more metrics.
pub trait Parser: Send + Sync {
    fn parse(&self, payload: &[u8]) -> Result<Vec<Metric>>;
}

/// Look up the parser for a `data_format` setting (case-insensitive).
pub fn parser_for(data_format: &str) -> Result<Arc<dyn Parser>> {
    match data_format.to_lowercase().as_str() {
        "json" => Ok(Arc::new(JsonParser::new())),
        other => Err(ParseError::UnsupportedFormat(other.to_string())),
    }
}
