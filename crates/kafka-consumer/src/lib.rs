//! Kafka consumer input that turns messages into metrics.
//!
//! Features:
//!
//! - Consumer Groups: joins a consumer group and follows partition rebalances
//! - TLS: optional SSL transport with client certificates
//! - Pluggable Decoding: payloads are decoded by a [`metric_types::Parser`]
//! - Pluggable Sink: metrics and ingestion errors go to a [`metric_types::Accumulator`]
//!
//! Delivery is at-least-once, governed by the consumer group's own offset
//! commits.

/// Host-facing start/stop surface
///
/// Owns the broker handle and the shutdown token of the running loop.
pub mod input;

/// Background event loop
///
/// Reads broker events and routes them to the parser and accumulator.
pub mod dispatch;

/// rdkafka-backed broker handle
pub mod consumer;

pub mod broker;
pub mod config;
pub mod error;
pub mod handle;
pub mod session;
pub mod testing;

// Re-export main types for easy access
pub use broker::{
    BrokerError, BrokerEvent, BrokerHandle, ConsumedMessage, Connector, TopicPartition,
};
pub use config::{Config, SAMPLE_CONFIG};
pub use consumer::{Consumer, RdKafkaConnector};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use handle::HandleManager;
pub use input::{KafkaConsumer, ServiceInput, DESCRIPTION};
pub use session::{OffsetPolicy, SecurityConfig, SessionConfig, TlsOptions, SESSION_TIMEOUT_MS};
