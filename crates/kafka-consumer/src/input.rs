//! Start/stop surface of the Kafka consumer input.

use std::sync::Arc;

use async_trait::async_trait;
use metric_types::{parser_for, Accumulator, Parser};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broker::Connector;
use crate::config::{Config, SAMPLE_CONFIG};
use crate::consumer::RdKafkaConnector;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::handle::HandleManager;
use crate::session::SessionConfig;

pub const DESCRIPTION: &str = "Read metrics from Kafka topic(s)";

/// A long-running input driven by a host scheduler.
///
/// `start` launches background collection and returns once it is running;
/// `stop` tears it down. `gather` is the host's periodic collection call.
#[async_trait]
pub trait ServiceInput: Send + Sync {
    fn description(&self) -> &'static str;

    fn sample_config(&self) -> &'static str;

    fn gather(&self, accumulator: &dyn Accumulator) -> Result<()>;

    async fn start(&self, accumulator: Arc<dyn Accumulator>) -> Result<()>;

    async fn stop(&self);
}

/// One launched dispatch loop.
struct Run {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

struct State<C: Connector> {
    handles: HandleManager<C>,
    accumulator: Option<Arc<dyn Accumulator>>,
    run: Option<Run>,
}

/// Consumes Kafka topics and feeds decoded metrics to an accumulator.
///
/// The lock only guards setup and teardown (handle, shutdown token and
/// accumulator). The dispatch loop never takes it, so `start`/`stop` do not
/// contend with message processing.
pub struct KafkaConsumer<C: Connector = RdKafkaConnector> {
    config: Config,
    parser: Arc<dyn Parser>,
    state: Mutex<State<C>>,
}

impl KafkaConsumer<RdKafkaConnector> {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, RdKafkaConnector)
    }
}

impl<C: Connector> KafkaConsumer<C> {
    /// Build an input whose parser is chosen by `config.data_format`.
    pub fn with_connector(config: Config, connector: C) -> Result<Self> {
        let parser =
            parser_for(&config.data_format).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Self::with_parser(config, connector, parser)
    }

    pub fn with_parser(config: Config, connector: C, parser: Arc<dyn Parser>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parser,
            state: Mutex::new(State {
                handles: HandleManager::new(connector),
                accumulator: None,
                run: None,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a dispatch loop is currently launched and not yet finished.
    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        state.run.as_ref().is_some_and(|run| !run.task.is_finished())
    }

    /// Stop, then wait for the dispatch loop to exit.
    pub async fn shutdown(&self) {
        if let Some(task) = self.stop_run().await {
            if let Err(e) = task.await {
                warn!("Kafka consumer loop ended abnormally: {e}");
            }
        }
    }

    async fn start_run(&self, accumulator: Arc<dyn Accumulator>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.accumulator = Some(Arc::clone(&accumulator));

        let session = SessionConfig::build(
            &self.config.brokers,
            &self.config.consumer_group,
            &self.config.offset,
            &self.config.tls(),
        );
        let handle = state
            .handles
            .ensure_connected(&session, &self.config.topics)?;

        if let Some(previous) = state.run.take() {
            warn!("Kafka consumer started while already running, replacing the previous loop");
            previous.shutdown.cancel();
        }

        let shutdown = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            handle,
            Arc::clone(&self.parser),
            accumulator,
            self.config.max_message_len,
        );
        let task = tokio::spawn(dispatcher.run(shutdown.clone()));
        state.run = Some(Run { shutdown, task });

        info!(
            "Started the Kafka consumer service, brokers: {}, topics: {:?}",
            self.config.brokers, self.config.topics
        );
        Ok(())
    }

    /// Signal the loop and close the handle; returns the loop's task so the
    /// caller may wait on it.
    async fn stop_run(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock().await;
        let run = state.run.take();
        if let Some(run) = &run {
            run.shutdown.cancel();
        }

        if let Err(e) = state.handles.close() {
            match &state.accumulator {
                Some(accumulator) => accumulator.add_error(Box::new(e)),
                None => warn!("{e}"),
            }
        }
        if run.is_some() {
            info!("Stopped the Kafka consumer service");
        }
        run.map(|run| run.task)
    }
}

#[async_trait]
impl<C: Connector> ServiceInput for KafkaConsumer<C> {
    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn sample_config(&self) -> &'static str {
        SAMPLE_CONFIG
    }

    /// Collection happens in the background loop; nothing to do here.
    fn gather(&self, _accumulator: &dyn Accumulator) -> Result<()> {
        Ok(())
    }

    async fn start(&self, accumulator: Arc<dyn Accumulator>) -> Result<()> {
        self.start_run(accumulator).await
    }

    /// Does not wait for the loop to exit; see [`KafkaConsumer::shutdown`].
    async fn stop(&self) {
        // Dropping the JoinHandle detaches the task.
        drop(self.stop_run().await);
    }
}
