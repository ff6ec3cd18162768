use crate::broker::{
    BrokerError, BrokerEvent, BrokerHandle, ConsumedMessage, Connector, TopicPartition,
};
use crate::session::SessionConfig;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{
    Consumer as RdkafkaConsumer, ConsumerContext, Rebalance, StreamConsumer as RdkafkaStreamConsumer,
};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{ClientContext, TopicPartitionList};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Build the rdkafka client configuration for a session.
pub fn client_config(config: &SessionConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    for (key, value) in config.client_params() {
        client_config.set(key, value);
    }
    client_config
}

/// Consumer context that turns librdkafka callbacks into [`BrokerEvent`]s.
///
/// Rebalance callbacks run on librdkafka's thread while it is being polled;
/// they only enqueue, the dispatch loop does the work.
///
/// `post_rebalance` fires after librdkafka's default rebalance handler has
/// already applied the assignment, so the forwarded `Assigned`/`Revoked`
/// events describe state that is in place. [`Consumer::assign`] and
/// [`Consumer::unassign`] skip the call when the current assignment already
/// matches; re-assigning would rewind fetch positions to the committed
/// offsets and redeliver anything received in between.
pub struct EventContext {
    events: mpsc::UnboundedSender<BrokerEvent>,
    forward_rebalance: bool,
}

impl EventContext {
    fn emit(&self, event: BrokerEvent) {
        if self.events.send(event).is_err() {
            debug!("Event stream receiver dropped, discarding event");
        }
    }
}

impl ClientContext for EventContext {
    fn error(&self, error: KafkaError, reason: &str) {
        warn!("librdkafka error: {error}: {reason}");
        self.emit(BrokerEvent::Error(BrokerError::Client(format!(
            "{error}: {reason}"
        ))));
    }
}

impl ConsumerContext for EventContext {
    fn post_rebalance(&self, rebalance: &Rebalance<'_>) {
        if !self.forward_rebalance {
            return;
        }
        let event = match rebalance {
            Rebalance::Assign(tpl) => BrokerEvent::Assigned(partitions_of(tpl)),
            Rebalance::Revoke(tpl) => BrokerEvent::Revoked(partitions_of(tpl)),
            Rebalance::Error(e) => {
                BrokerEvent::Error(BrokerError::Client(format!("Rebalance error: {e}")))
            }
        };
        self.emit(event);
    }
}

fn owned_message<M: RdkafkaMessage>(msg: &M) -> ConsumedMessage {
    ConsumedMessage {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(|k| k.to_vec()),
        payload: msg.payload().map(|p| p.to_vec()),
        timestamp: msg.timestamp().to_millis(),
    }
}

/// Whether `current` holds exactly the given partitions.
fn same_assignment(current: &TopicPartitionList, partitions: &[TopicPartition]) -> bool {
    let mut current = partitions_of(current);
    let mut wanted = partitions.to_vec();
    current.sort();
    wanted.sort();
    current == wanted
}

fn partitions_of(tpl: &TopicPartitionList) -> Vec<TopicPartition> {
    tpl.elements()
        .iter()
        .map(|elem| TopicPartition::new(elem.topic(), elem.partition()))
        .collect()
}

/// Kafka consumer handle backed by an rdkafka [`RdkafkaStreamConsumer`].
///
/// Messages come from the stream consumer; rebalances and client errors come
/// from the context's queue. Both are merged by [`BrokerHandle::next_event`].
pub struct Consumer {
    consumer: RdkafkaStreamConsumer<EventContext>,
    events: Mutex<mpsc::UnboundedReceiver<BrokerEvent>>,
    closed: AtomicBool,
}

impl Consumer {
    /// Create a new Kafka consumer
    pub fn new(config: &SessionConfig) -> Result<Self, BrokerError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = EventContext {
            events: sender,
            forward_rebalance: config.application_rebalance,
        };
        let consumer: RdkafkaStreamConsumer<EventContext> =
            client_config(config).create_with_context(context)?;

        Ok(Self {
            consumer,
            events: Mutex::new(receiver),
            closed: AtomicBool::new(false),
        })
    }

    fn to_event(received: Result<RdkafkaBorrowedMessage<'_>, KafkaError>) -> BrokerEvent {
        match received {
            Ok(msg) => BrokerEvent::Message(owned_message(&msg)),
            Err(KafkaError::PartitionEOF(partition)) => BrokerEvent::PartitionEof {
                topic: None,
                partition,
            },
            Err(e) => BrokerEvent::Error(e.into()),
        }
    }
}

#[async_trait]
impl BrokerHandle for Consumer {
    fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError> {
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer.subscribe(&topics)?;
        Ok(())
    }

    async fn next_event(&self) -> Option<BrokerEvent> {
        let mut events = self.events.lock().await;
        tokio::select! {
            biased;
            Some(event) = events.recv() => Some(event),
            received = self.consumer.recv() => Some(Self::to_event(received)),
        }
    }

    fn assign(&self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        if let Ok(current) = self.consumer.assignment() {
            if same_assignment(&current, partitions) {
                debug!("Partitions already assigned, skipping assign");
                return Ok(());
            }
        }
        let mut tpl = TopicPartitionList::new();
        for tp in partitions {
            tpl.add_partition(&tp.topic, tp.partition);
        }
        self.consumer.assign(&tpl)?;
        Ok(())
    }

    fn unassign(&self) -> Result<(), BrokerError> {
        if let Ok(current) = self.consumer.assignment() {
            if current.count() == 0 {
                debug!("No partitions assigned, skipping unassign");
                return Ok(());
            }
        }
        self.consumer.unassign()?;
        Ok(())
    }

    /// Leave the group and stop fetching. The librdkafka handle itself is
    /// destroyed when the last reference to this consumer is dropped.
    fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.consumer.unsubscribe();
        self.consumer.unassign()?;
        Ok(())
    }
}

/// Connector producing rdkafka-backed [`Consumer`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdKafkaConnector;

impl Connector for RdKafkaConnector {
    type Handle = Consumer;

    fn connect(&self, config: &SessionConfig) -> Result<Consumer, BrokerError> {
        Consumer::new(config)
    }
}
