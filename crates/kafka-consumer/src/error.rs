use metric_types::ParseError;
use thiserror::Error;

use crate::broker::BrokerError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to create consumer: {0}")]
    Connect(#[source] BrokerError),

    #[error("Failed to subscribe to topics {topics:?}: {source}")]
    Subscribe {
        topics: Vec<String>,
        #[source]
        source: BrokerError,
    },

    #[error("Error closing consumer: {0}")]
    Close(#[source] BrokerError),

    #[error("Kafka error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Message parse error: {source}\nmessage: {message}")]
    MessageParse {
        message: String,
        #[source]
        source: ParseError,
    },

    #[error("Message on {topic}[{partition}]@{offset} is {len} bytes, over max_message_len {max}")]
    MessageTooLarge {
        topic: String,
        partition: i32,
        offset: i64,
        len: usize,
        max: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
