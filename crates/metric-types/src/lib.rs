//! Metric data model shared by the Kafka ingestion crates.
//!
//! This crate provides:
//! - [`Metric`] and its field/tag maps, the unit handed to the downstream sink
//! - [`Parser`], the pluggable payload decoder invoked once per Kafka message
//! - [`Accumulator`], the pluggable sink receiving metrics and ingestion errors
//!
//! # Dependency Direction
//!
//! The consumer crate depends on this crate, NOT the other way around, so
//! parsers and sinks can be written without pulling in rdkafka.

pub mod accumulator;
pub mod error;
pub mod json;
pub mod metric;
pub mod parser;

pub use accumulator::{Accumulator, IngestError};
pub use error::{ParseError, Result};
pub use json::JsonParser;
pub use metric::{FieldValue, Fields, Metric, Tags};
pub use parser::{parser_for, Parser};
