//! Warden Broker - Message transport
//!
//! A small topic-exchange abstraction: queues bound to an exchange by
//! routing-key patterns, publish with correlation metadata, and
//! prefetch-bounded consumption with explicit acknowledgement.
//!
//! Two implementations:
//! - [`MemoryBroker`] for tests and single-process runs
//! - [`RedisStreamsTransport`] for separate processes, one stream per queue

pub mod error;
pub mod memory;
pub mod message;
pub mod redis_streams;
pub mod topic;
pub mod transport;

pub use error::BrokerError;
pub use memory::MemoryBroker;
pub use message::{Acker, ConsumeOptions, Delivery, Message, Properties, QueueBinding};
pub use redis_streams::{RedisStreamsConfig, RedisStreamsTransport};
pub use topic::{route, topic_matches};
pub use transport::{SharedTransport, Subscription, Transport};
