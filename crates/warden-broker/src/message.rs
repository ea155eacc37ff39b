//! Messages, bindings and deliveries

use async_trait::async_trait;
use tokio::sync::OwnedSemaphorePermit;

use crate::BrokerError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Protocol metadata carried beside the body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub content_type: Option<String>,
}

impl Properties {
    pub fn json() -> Self {
        Self {
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            ..Self::default()
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_reply_to(mut self, queue: impl Into<String>) -> Self {
        self.reply_to = Some(queue.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Key the message was published with (the queue name for direct sends)
    pub routing_key: String,
    pub properties: Properties,
    pub body: Vec<u8>,
}

/// Queue bound to an exchange by a topic pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueBinding {
    pub exchange: String,
    pub queue: String,
    pub pattern: String,
}

impl QueueBinding {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// Maximum unacknowledged deliveries outstanding on the subscription
    pub prefetch: usize,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self { prefetch: 1 }
    }
}

impl ConsumeOptions {
    pub fn prefetch(prefetch: usize) -> Self {
        Self {
            prefetch: prefetch.max(1),
        }
    }
}

/// Transport-specific acknowledgement
#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self) -> Result<(), BrokerError>;
}

/// A message handed to a consumer.
///
/// Holds one prefetch slot until it is acknowledged or dropped.
pub struct Delivery {
    pub queue: String,
    pub message: Message,
    acker: Option<Box<dyn Acker>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Delivery {
    pub fn new(queue: impl Into<String>, message: Message) -> Self {
        Self {
            queue: queue.into(),
            message,
            acker: None,
            permit: None,
        }
    }

    pub fn with_acker(mut self, acker: Box<dyn Acker>) -> Self {
        self.acker = Some(acker);
        self
    }

    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.permit = Some(permit);
        self
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.message.properties.correlation_id.as_deref()
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.message.properties.reply_to.as_deref()
    }

    /// Acknowledge and release the prefetch slot
    pub async fn ack(mut self) -> Result<(), BrokerError> {
        let result = match self.acker.take() {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        };
        drop(self.permit.take());
        result
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("queue", &self.queue)
            .field("message", &self.message)
            .field("pending_ack", &self.acker.is_some())
            .finish()
    }
}
