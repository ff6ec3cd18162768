//! kafka-metrics library
//!
//! Glue between the command-line binary and the Kafka consumer input:
//!
//! - [`config`] - loading the TOML configuration file
//! - [`sink`] - the stdout accumulator that receives decoded metrics
//!
//! # CLI Usage
//!
//! ```bash
//! # Print a sample configuration file
//! kafka-metrics sample-config > kafka-metrics.toml
//!
//! # Consume until interrupted, writing one JSON line per metric to stdout
//! RUST_LOG=info kafka-metrics run --config kafka-metrics.toml
//! ```

pub mod config;
pub mod sink;

pub use config::AppConfig;
pub use sink::JsonLinesSink;
