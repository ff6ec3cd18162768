//! Ownership of the broker connection across starts and stops.

use std::sync::Arc;

use tracing::info;

use crate::broker::{BrokerHandle, Connector};
use crate::error::{Error, Result};
use crate::session::SessionConfig;

/// Creates, subscribes and tears down the broker handle.
///
/// At most one handle exists at a time. A handle whose subscription failed
/// is kept, and the next [`HandleManager::ensure_connected`] retries the
/// subscription on it rather than connecting again.
pub struct HandleManager<C: Connector> {
    connector: C,
    handle: Option<Arc<C::Handle>>,
    subscribed: bool,
}

impl<C: Connector> HandleManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            handle: None,
            subscribed: false,
        }
    }

    /// Return the live handle, connecting and subscribing first if needed.
    pub fn ensure_connected(
        &mut self,
        config: &SessionConfig,
        topics: &[String],
    ) -> Result<Arc<C::Handle>> {
        if self.subscribed {
            if let Some(handle) = &self.handle {
                return Ok(Arc::clone(handle));
            }
        }

        let handle = match self.handle.clone() {
            Some(handle) => handle,
            None => {
                let handle = Arc::new(self.connector.connect(config).map_err(Error::Connect)?);
                info!(
                    "Created Kafka consumer: brokers={}, group={}",
                    config.brokers, config.group_id
                );
                self.handle = Some(Arc::clone(&handle));
                handle
            }
        };

        handle
            .subscribe(topics)
            .map_err(|source| Error::Subscribe {
                topics: topics.to_vec(),
                source,
            })?;
        self.subscribed = true;
        info!("Subscribed to topics {topics:?}");

        Ok(handle)
    }

    /// Close and forget the current handle. A no-op when there is none.
    pub fn close(&mut self) -> Result<()> {
        self.subscribed = false;
        match self.handle.take() {
            Some(handle) => handle.close().map_err(Error::Close),
            None => Ok(()),
        }
    }

    pub fn handle(&self) -> Option<&Arc<C::Handle>> {
        self.handle.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}
