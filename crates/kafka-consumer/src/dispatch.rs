//! The background loop that turns broker events into metrics.

use std::sync::Arc;

use metric_types::{Accumulator, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::broker::{BrokerEvent, BrokerHandle, ConsumedMessage};
use crate::error::Error;

/// Routes events from one broker handle to the parser and accumulator.
///
/// Events are handled one at a time in the order the handle yields them.
/// Nothing that happens inside the loop stops it: parse failures, oversized
/// messages and broker errors are reported to the accumulator and the loop
/// moves on. Only the shutdown token ends a run.
pub struct Dispatcher<H: BrokerHandle> {
    handle: Arc<H>,
    parser: Arc<dyn Parser>,
    accumulator: Arc<dyn Accumulator>,
    /// 0 means unlimited
    max_message_len: usize,
}

impl<H: BrokerHandle> Dispatcher<H> {
    pub fn new(
        handle: Arc<H>,
        parser: Arc<dyn Parser>,
        accumulator: Arc<dyn Accumulator>,
        max_message_len: usize,
    ) -> Self {
        Self {
            handle,
            parser,
            accumulator,
            max_message_len,
        }
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.handle.next_event() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        debug!("Broker event stream ended, waiting for shutdown");
                        shutdown.cancelled().await;
                        break;
                    }
                },
            }
        }
        info!("Kafka consumer loop terminated");
    }

    pub fn dispatch(&self, event: BrokerEvent) {
        match event {
            BrokerEvent::Assigned(partitions) => {
                debug!("Partitions assigned: {partitions:?}");
                if let Err(e) = self.handle.assign(&partitions) {
                    self.accumulator.add_error(Box::new(Error::Broker(e)));
                }
            }
            BrokerEvent::Revoked(partitions) => {
                debug!("Partitions revoked: {partitions:?}");
                if let Err(e) = self.handle.unassign() {
                    self.accumulator.add_error(Box::new(Error::Broker(e)));
                }
            }
            BrokerEvent::Message(message) => self.handle_message(message),
            BrokerEvent::PartitionEof { topic, partition } => {
                debug!(
                    "Reached end of partition {}[{partition}]",
                    topic.as_deref().unwrap_or("?")
                );
            }
            BrokerEvent::Error(e) => {
                warn!("Kafka error: {e}");
                self.accumulator.add_error(Box::new(Error::Broker(e)));
            }
            BrokerEvent::Other(kind) => trace!("Ignoring broker event: {kind}"),
        }
    }

    fn handle_message(&self, message: ConsumedMessage) {
        let payload = message.payload.as_deref().unwrap_or_default();
        debug!(
            "Message on {}[{}]@{}: {} bytes, key {} bytes, timestamp {:?}",
            message.topic,
            message.partition,
            message.offset,
            payload.len(),
            message.key.as_ref().map_or(0, Vec::len),
            message.timestamp
        );

        if self.max_message_len > 0 && payload.len() > self.max_message_len {
            self.accumulator.add_error(Box::new(Error::MessageTooLarge {
                topic: message.topic.clone(),
                partition: message.partition,
                offset: message.offset,
                len: payload.len(),
                max: self.max_message_len,
            }));
            return;
        }

        match self.parser.parse(payload) {
            Ok(metrics) => {
                for metric in metrics {
                    self.accumulator.add_fields(
                        &metric.name,
                        metric.fields,
                        metric.tags,
                        metric.timestamp,
                    );
                }
            }
            Err(source) => {
                self.accumulator.add_error(Box::new(Error::MessageParse {
                    message: String::from_utf8_lossy(payload).into_owned(),
                    source,
                }));
            }
        }
    }
}
