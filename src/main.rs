//! Command-line interface for kafka-metrics
//!
//! # Usage Examples
//!
//! ```bash
//! # Print a sample configuration
//! kafka-metrics sample-config > kafka-metrics.toml
//!
//! # Consume metrics until Ctrl-C
//! kafka-metrics run --config kafka-metrics.toml
//!
//! # Same, with the config path from the environment and debug logs
//! KAFKA_METRICS_CONFIG=kafka-metrics.toml RUST_LOG=kafka_consumer=debug kafka-metrics run
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kafka_consumer::{KafkaConsumer, ServiceInput};
use kafka_metrics::{config, AppConfig, JsonLinesSink};
use tracing::info;

#[derive(Parser)]
#[command(name = "kafka-metrics")]
#[command(about = "Consume metrics from Kafka topics and write them as JSON lines")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume metrics until interrupted
    Run {
        /// Path to the TOML configuration file
        #[arg(long, env = "KAFKA_METRICS_CONFIG")]
        config: PathBuf,
    },

    /// Print a sample configuration file
    SampleConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run_consumer(config).await,
        Commands::SampleConfig => {
            println!("{}", config::sample_config());
            Ok(())
        }
    }
}

async fn run_consumer(path: PathBuf) -> anyhow::Result<()> {
    let app_config = AppConfig::load(&path)?;
    let input = KafkaConsumer::new(app_config.kafka_consumer)
        .context("Failed to configure Kafka consumer")?;
    info!("{}", input.description());

    let sink = Arc::new(JsonLinesSink::stdout());
    input
        .start(sink.clone())
        .await
        .context("Failed to start Kafka consumer")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Interrupted, shutting down");

    input.shutdown().await;
    info!(
        "Kafka consumer stopped: {} metrics written, {} errors",
        sink.metric_count(),
        sink.error_count()
    );
    Ok(())
}
