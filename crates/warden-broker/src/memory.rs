//! In-process broker
//!
//! Queues live for the broker's lifetime, so messages published while no
//! consumer is attached wait for one. Several subscriptions on one queue
//! compete for its messages.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Notify, Semaphore};

use crate::message::{ConsumeOptions, Delivery, Message, Properties, QueueBinding};
use crate::topic::route;
use crate::transport::{Subscription, Transport};
use crate::BrokerError;

#[derive(Default)]
struct MemoryQueue {
    messages: Mutex<VecDeque<Message>>,
    notify: Notify,
}

impl MemoryQueue {
    fn push(&self, message: Message) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push_back(message);
        }
        self.notify.notify_one();
    }

    fn push_front(&self, message: Message) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push_front(message);
        }
        self.notify.notify_one();
    }

    fn try_pop(&self) -> Option<(Message, bool)> {
        let mut messages = self.messages.lock().ok()?;
        let message = messages.pop_front()?;
        Some((message, !messages.is_empty()))
    }

    async fn pop(&self) -> Message {
        loop {
            let notified = self.notify.notified();
            if let Some((message, more)) = self.try_pop() {
                if more {
                    // Pass the wakeup on to a competing consumer
                    self.notify.notify_one();
                }
                return message;
            }
            notified.await;
        }
    }

    fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[derive(Default)]
struct Inner {
    bindings: RwLock<Vec<QueueBinding>>,
    queues: DashMap<String, Arc<MemoryQueue>>,
    consumer_seq: AtomicU64,
    closed: AtomicBool,
}

/// In-process topic broker. Clones share the same queues.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting in a queue (not counting unacknowledged deliveries)
    pub fn queue_len(&self, queue: &str) -> usize {
        self.inner.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }

    fn queue(&self, name: &str) -> Result<Arc<MemoryQueue>, BrokerError> {
        self.inner
            .queues
            .get(name)
            .map(|q| Arc::clone(q.value()))
            .ok_or_else(|| BrokerError::UnknownQueue(name.to_string()))
    }

    fn route(&self, exchange: &str, routing_key: &str) -> Option<BTreeSet<String>> {
        let bindings = self.inner.bindings.read().ok()?;
        route(&bindings, exchange, routing_key)
    }
}

#[async_trait]
impl Transport for MemoryBroker {
    async fn declare(&self, bindings: &[QueueBinding]) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let mut existing = self
            .inner
            .bindings
            .write()
            .map_err(|_| BrokerError::Connection("binding table poisoned".into()))?;
        for binding in bindings {
            self.inner
                .queues
                .entry(binding.queue.clone())
                .or_default();
            if !existing.contains(binding) {
                tracing::debug!(
                    exchange = %binding.exchange,
                    queue = %binding.queue,
                    pattern = %binding.pattern,
                    "Declared binding"
                );
                existing.push(binding.clone());
            }
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: Properties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let targets = self
            .route(exchange, routing_key)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange.to_string()))?;

        if targets.is_empty() {
            tracing::debug!(exchange, routing_key, "Dropped unroutable message");
            return Ok(());
        }

        let message = Message {
            routing_key: routing_key.to_string(),
            properties,
            body,
        };
        for queue in targets {
            self.queue(&queue)?.push(message.clone());
        }
        Ok(())
    }

    async fn send_to_queue(
        &self,
        queue: &str,
        properties: Properties,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.queue(queue)?.push(Message {
            routing_key: queue.to_string(),
            properties,
            body,
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        options: ConsumeOptions,
    ) -> Result<Subscription, BrokerError> {
        self.ensure_open()?;
        let source = self.queue(queue)?;
        let prefetch = options.prefetch.max(1);
        let slots = Arc::new(Semaphore::new(prefetch));
        let (tx, rx) = mpsc::channel(prefetch);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let seq = self.inner.consumer_seq.fetch_add(1, Ordering::Relaxed);
        let consumer_tag = format!("memory-{queue}-{seq}");
        let queue_name = queue.to_string();

        let task = tokio::spawn(async move {
            loop {
                let permit = tokio::select! {
                    _ = &mut cancel_rx => break,
                    permit = Arc::clone(&slots).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                let message = tokio::select! {
                    _ = &mut cancel_rx => break,
                    message = source.pop() => message,
                };

                let delivery = Delivery::new(queue_name.clone(), message).with_permit(permit);
                if let Err(mpsc::error::SendError(undelivered)) = tx.send(delivery).await {
                    source.push_front(undelivered.message);
                    break;
                }
            }
            tracing::debug!(queue = %queue_name, "Memory consumer stopped");
        });

        Ok(Subscription::new(queue, consumer_tag, rx, cancel_tx, task))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
