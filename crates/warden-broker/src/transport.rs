//! The transport seam between the RPC layer and a concrete broker

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::message::{ConsumeOptions, Delivery, Properties, QueueBinding};
use crate::BrokerError;

/// A topic-exchange broker connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create queues and bind them. Idempotent.
    async fn declare(&self, bindings: &[QueueBinding]) -> Result<(), BrokerError>;

    /// Publish to an exchange. Messages matching no binding are dropped.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: Properties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError>;

    /// Deliver straight to a named queue, bypassing exchange routing
    async fn send_to_queue(
        &self,
        queue: &str,
        properties: Properties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError>;

    /// Start consuming a queue
    async fn subscribe(
        &self,
        queue: &str,
        options: ConsumeOptions,
    ) -> Result<Subscription, BrokerError>;

    /// Release connections. Later calls fail with [`BrokerError::Closed`].
    async fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// Shared transport type
pub type SharedTransport = Arc<dyn Transport>;

/// An active consumer on one queue
pub struct Subscription {
    pub queue: String,
    pub consumer_tag: String,
    deliveries: mpsc::Receiver<Delivery>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(
        queue: impl Into<String>,
        consumer_tag: impl Into<String>,
        deliveries: mpsc::Receiver<Delivery>,
        cancel: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            queue: queue.into(),
            consumer_tag: consumer_tag.into(),
            deliveries,
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    /// Next delivery, or `None` once the subscription has ended
    pub async fn next(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    /// Stop consuming and wait for the pump to exit
    pub async fn cancel(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("queue", &self.queue)
            .field("consumer_tag", &self.consumer_tag)
            .finish_non_exhaustive()
    }
}
