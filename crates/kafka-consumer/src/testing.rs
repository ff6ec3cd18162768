//! In-memory stand-ins for the broker and the accumulator.
//!
//! [`MockBroker`] implements [`Connector`]; every handle it creates reads
//! from one shared event queue fed by [`MockBroker::send`], and records the
//! calls made on it. [`RecordingAccumulator`] keeps everything it is given.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metric_types::{Accumulator, Fields, IngestError, Metric, Tags};
use tokio::sync::mpsc;

use crate::broker::{
    BrokerError, BrokerEvent, BrokerHandle, ConsumedMessage, Connector, TopicPartition,
};
use crate::session::SessionConfig;

/// A call made on a [`MockHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleCall {
    Subscribe(Vec<String>),
    Assign(Vec<TopicPartition>),
    Unassign,
    Close,
}

struct BrokerState {
    sender: mpsc::UnboundedSender<BrokerEvent>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<BrokerEvent>>,
    connects: AtomicUsize,
    fail_connect: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_close: AtomicBool,
    calls: Mutex<Vec<HandleCall>>,
    sessions: Mutex<Vec<SessionConfig>>,
}

#[derive(Clone)]
pub struct MockBroker {
    state: Arc<BrokerState>,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroker {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(BrokerState {
                sender,
                receiver: tokio::sync::Mutex::new(receiver),
                connects: AtomicUsize::new(0),
                fail_connect: AtomicBool::new(false),
                fail_subscribe: AtomicBool::new(false),
                fail_close: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
                sessions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Queue an event for whichever handle reads next.
    pub fn send(&self, event: BrokerEvent) {
        // The receiver lives as long as the broker state.
        let _ = self.state.sender.send(event);
    }

    /// Queue a message on `topic` partition 0.
    pub fn send_message(&self, topic: &str, payload: &[u8]) {
        self.send(BrokerEvent::Message(ConsumedMessage {
            topic: topic.to_string(),
            payload: Some(payload.to_vec()),
            ..Default::default()
        }));
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.state.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.state.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Number of handles successfully created.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<HandleCall> {
        lock(&self.state.calls).clone()
    }

    /// Session configurations passed to `connect`, in order.
    pub fn sessions(&self) -> Vec<SessionConfig> {
        lock(&self.state.sessions).clone()
    }

    fn record(&self, call: HandleCall) {
        lock(&self.state.calls).push(call);
    }
}

impl Connector for MockBroker {
    type Handle = MockHandle;

    fn connect(&self, config: &SessionConfig) -> Result<MockHandle, BrokerError> {
        lock(&self.state.sessions).push(config.clone());
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(BrokerError::Client("connection refused".to_string()));
        }
        let id = self.state.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockHandle {
            id,
            broker: self.clone(),
        })
    }
}

pub struct MockHandle {
    id: usize,
    broker: MockBroker,
}

impl std::fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHandle").field("id", &self.id).finish()
    }
}

impl MockHandle {
    /// 1-based creation order.
    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl BrokerHandle for MockHandle {
    fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError> {
        if self.broker.state.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BrokerError::Client("unknown topic".to_string()));
        }
        self.broker.record(HandleCall::Subscribe(topics.to_vec()));
        Ok(())
    }

    async fn next_event(&self) -> Option<BrokerEvent> {
        self.broker.state.receiver.lock().await.recv().await
    }

    fn assign(&self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        self.broker.record(HandleCall::Assign(partitions.to_vec()));
        Ok(())
    }

    fn unassign(&self) -> Result<(), BrokerError> {
        self.broker.record(HandleCall::Unassign);
        Ok(())
    }

    fn close(&self) -> Result<(), BrokerError> {
        self.broker.record(HandleCall::Close);
        if self.broker.state.fail_close.load(Ordering::SeqCst) {
            return Err(BrokerError::Client("close timed out".to_string()));
        }
        Ok(())
    }
}

/// Accumulator that records every metric and error it receives.
#[derive(Default)]
pub struct RecordingAccumulator {
    metrics: Mutex<Vec<Metric>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingAccumulator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn metrics(&self) -> Vec<Metric> {
        lock(&self.metrics).clone()
    }

    /// Errors received, rendered with `Display`.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    /// Poll until `done` holds, for at most five seconds.
    pub async fn wait_for(&self, done: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !done(self) {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

impl Accumulator for RecordingAccumulator {
    fn add_fields(&self, name: &str, fields: Fields, tags: Tags, timestamp: DateTime<Utc>) {
        lock(&self.metrics).push(Metric::new(name, fields, tags, timestamp));
    }

    fn add_error(&self, error: IngestError) {
        lock(&self.errors).push(error.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
