//! The seam between the consumer input and the Kafka client library.
//!
//! The input only needs a handful of operations from the client: connect,
//! subscribe, read the next event, follow rebalances and close. They are
//! expressed as traits so the dispatch loop and lifecycle can run against
//! rdkafka in production and against an in-memory broker in tests.

use async_trait::async_trait;
use rdkafka::error::KafkaError;
use thiserror::Error;

use crate::session::SessionConfig;

/// Errors reported by the broker client.
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    #[error(transparent)]
    Kafka(#[from] KafkaError),

    #[error("{0}")]
    Client(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// A raw message as delivered by the broker.
#[derive(Debug, Clone, Default)]
pub struct ConsumedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Message value; `None` for tombstones
    pub payload: Option<Vec<u8>>,
    /// Message timestamp (milliseconds since epoch)
    pub timestamp: Option<i64>,
}

/// Everything the broker client can surface on its event stream.
#[derive(Debug)]
pub enum BrokerEvent {
    /// The group handed these partitions to this member.
    Assigned(Vec<TopicPartition>),
    /// The group took these partitions away.
    Revoked(Vec<TopicPartition>),
    Message(ConsumedMessage),
    /// Reached the current end of a partition.
    PartitionEof {
        topic: Option<String>,
        partition: i32,
    },
    /// A broker or client error; usually transient.
    Error(BrokerError),
    /// Any event kind the consumer does not act on.
    Other(String),
}

/// A live connection to the broker.
#[async_trait]
pub trait BrokerHandle: Send + Sync + 'static {
    fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError>;

    /// Wait for the next event. `None` means the stream has ended and no
    /// further events will arrive.
    async fn next_event(&self) -> Option<BrokerEvent>;

    fn assign(&self, partitions: &[TopicPartition]) -> Result<(), BrokerError>;

    fn unassign(&self) -> Result<(), BrokerError>;

    fn close(&self) -> Result<(), BrokerError>;
}

/// Creates broker handles from session configuration.
pub trait Connector: Send + Sync + 'static {
    type Handle: BrokerHandle;

    fn connect(&self, config: &SessionConfig) -> Result<Self::Handle, BrokerError>;
}
