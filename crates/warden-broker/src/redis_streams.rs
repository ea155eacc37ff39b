//! Redis Streams transport
//!
//! Each queue is the stream `{prefix}:queue:{name}` read through a consumer
//! group named after the queue, so subscriptions on the same queue compete
//! for entries. Exchange routing happens locally against the declared
//! bindings; the exchange itself has no Redis representation.
//!
//! Streams stay bounded: acknowledged entries are deleted with `XDEL` and
//! every `XADD` carries an approximate `MAXLEN` cap for entries nobody
//! consumes.
//!
//! Every subscription gets its own connection because `XREADGROUP BLOCK`
//! would otherwise stall unrelated commands. A failing subscription
//! reconnects with exponential backoff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use tokio::sync::{mpsc, oneshot, Semaphore};

use crate::message::{Acker, ConsumeOptions, Delivery, Message, Properties, QueueBinding};
use crate::topic::route;
use crate::transport::{Subscription, Transport};
use crate::BrokerError;

const FIELD_ROUTING_KEY: &str = "routing_key";
const FIELD_BODY: &str = "body";
const FIELD_CORRELATION_ID: &str = "correlation_id";
const FIELD_REPLY_TO: &str = "reply_to";
const FIELD_CONTENT_TYPE: &str = "content_type";

/// XREADGROUP reply: [(stream, [(entry id, [(field, value)])])]
type StreamReply = Vec<(String, Vec<(String, Vec<(String, Vec<u8>)>)>)>;

#[derive(Debug, Clone)]
pub struct RedisStreamsConfig {
    pub url: String,
    /// Namespace for stream keys
    pub prefix: String,
    /// Consumer name inside each group; unique per process by default
    pub consumer_name: String,
    /// How long one XREADGROUP call blocks
    pub block: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Approximate upper bound on entries kept per stream
    pub max_len: usize,
}

impl RedisStreamsConfig {
    pub fn new(url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: prefix.into(),
            consumer_name: format!("consumer-{}", uuid::Uuid::new_v4()),
            block: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            max_len: Self::DEFAULT_MAX_LEN,
        }
    }

    pub const DEFAULT_MAX_LEN: usize = 10_000;

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.max(1);
        self
    }

    pub fn stream_key(&self, queue: &str) -> String {
        format!("{}:queue:{}", self.prefix, queue)
    }
}

pub struct RedisStreamsTransport {
    config: RedisStreamsConfig,
    client: redis::Client,
    conn: ConnectionManager,
    bindings: RwLock<Vec<QueueBinding>>,
    consumer_seq: AtomicU64,
    closed: AtomicBool,
}

impl RedisStreamsTransport {
    /// Connect and verify the server answers `PING`. Failure here is fatal
    /// to the caller; later connection loss is recovered per subscription.
    pub async fn connect(config: RedisStreamsConfig) -> Result<Self, BrokerError> {
        let client = redis::Client::open(config.url.as_str())?;
        let mut conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        tracing::info!(prefix = %config.prefix, "Connected to Redis Streams broker");

        Ok(Self {
            config,
            client,
            conn,
            bindings: RwLock::new(Vec::new()),
            consumer_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }

    async fn create_group(&self, queue: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        create_group(&mut conn, &self.config.stream_key(queue), queue).await
    }

    async fn append(&self, queue: &str, routing_key: &str, properties: &Properties, body: &[u8]) -> Result<(), BrokerError> {
        let cmd = xadd(&self.config, queue, routing_key, properties, body);
        let mut conn = self.conn.clone();
        let _: String = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }
}

/// `XGROUP CREATE key group 0 MKSTREAM`; an existing group is fine
async fn create_group<C>(conn: &mut C, key: &str, group: &str) -> Result<(), BrokerError>
where
    C: redis::aio::ConnectionLike + Send,
{
    let result: redis::RedisResult<String> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(key)
        .arg(group)
        .arg("0")
        .arg("MKSTREAM")
        .query_async(conn)
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// `XADD key MAXLEN ~ n * field value ...`
fn xadd(
    config: &RedisStreamsConfig,
    queue: &str,
    routing_key: &str,
    properties: &Properties,
    body: &[u8],
) -> redis::Cmd {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(config.stream_key(queue))
        .arg("MAXLEN")
        .arg("~")
        .arg(config.max_len)
        .arg("*")
        .arg(FIELD_ROUTING_KEY)
        .arg(routing_key)
        .arg(FIELD_BODY)
        .arg(body);
    if let Some(id) = &properties.correlation_id {
        cmd.arg(FIELD_CORRELATION_ID).arg(id);
    }
    if let Some(reply_to) = &properties.reply_to {
        cmd.arg(FIELD_REPLY_TO).arg(reply_to);
    }
    if let Some(content_type) = &properties.content_type {
        cmd.arg(FIELD_CONTENT_TYPE).arg(content_type);
    }
    cmd
}

#[async_trait]
impl Transport for RedisStreamsTransport {
    async fn declare(&self, bindings: &[QueueBinding]) -> Result<(), BrokerError> {
        self.ensure_open()?;
        for binding in bindings {
            self.create_group(&binding.queue).await?;
        }
        let mut existing = self
            .bindings
            .write()
            .map_err(|_| BrokerError::Connection("binding table poisoned".into()))?;
        for binding in bindings {
            if !existing.contains(binding) {
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
        let targets = {
            let bindings = self
                .bindings
                .read()
                .map_err(|_| BrokerError::Connection("binding table poisoned".into()))?;
            route(&bindings, exchange, routing_key)
        }
        .ok_or_else(|| BrokerError::UnknownExchange(exchange.to_string()))?;

        if targets.is_empty() {
            tracing::debug!(exchange, routing_key, "Dropped unroutable message");
        }
        for queue in targets {
            self.append(&queue, routing_key, &properties, &body).await?;
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
        self.append(queue, queue, &properties, &body).await
    }

    async fn subscribe(
        &self,
        queue: &str,
        options: ConsumeOptions,
    ) -> Result<Subscription, BrokerError> {
        self.ensure_open()?;
        // The group must exist before the first XREADGROUP
        self.create_group(queue).await?;

        let prefetch = options.prefetch.max(1);
        let (tx, rx) = mpsc::channel(prefetch);
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let seq = self.consumer_seq.fetch_add(1, Ordering::Relaxed);
        let consumer_tag = format!("{}-{}", self.config.consumer_name, seq);

        let pump = StreamPump {
            client: self.client.clone(),
            acks: self.conn.clone(),
            config: self.config.clone(),
            queue: queue.to_string(),
            consumer: consumer_tag.clone(),
            slots: Arc::new(Semaphore::new(prefetch)),
        };
        let task = tokio::spawn(pump.run(tx, cancel_rx));

        Ok(Subscription::new(queue, consumer_tag, rx, cancel_tx, task))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Background reader behind one [`Subscription`]
struct StreamPump {
    client: redis::Client,
    acks: ConnectionManager,
    config: RedisStreamsConfig,
    queue: String,
    consumer: String,
    slots: Arc<Semaphore>,
}

impl StreamPump {
    async fn run(self, tx: mpsc::Sender<Delivery>, mut cancel: oneshot::Receiver<()>) {
        let key = self.config.stream_key(&self.queue);
        let mut conn: Option<MultiplexedConnection> = None;
        let mut backoff = self.config.initial_backoff;

        'outer: loop {
            let permit = tokio::select! {
                _ = &mut cancel => break,
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (entry_id, message) = loop {
                if conn.is_none() {
                    let connected = tokio::select! {
                        _ = &mut cancel => break 'outer,
                        c = self.client.get_multiplexed_async_connection() => c,
                    };
                    match connected {
                        Ok(c) => {
                            backoff = self.config.initial_backoff;
                            conn = Some(c);
                        }
                        Err(e) => {
                            tracing::warn!(queue = %self.queue, error = %e, "Redis reconnect failed");
                            if self.sleep_or_cancel(&mut cancel, &mut backoff).await {
                                break 'outer;
                            }
                            continue;
                        }
                    }
                }
                let Some(active) = conn.as_mut() else {
                    continue;
                };

                let read = tokio::select! {
                    _ = &mut cancel => break 'outer,
                    r = self.read_one(active, &key) => r,
                };
                match read {
                    Ok(Some(entry)) => break entry,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(queue = %self.queue, error = %e, "Redis stream read failed");
                        if e.is_connection() {
                            conn = None;
                        } else if let Some(active) = conn.as_mut() {
                            // Stream or group lost, e.g. after a Redis restart without persistence
                            if let Err(e) = create_group(active, &key, &self.queue).await {
                                tracing::warn!(queue = %self.queue, error = %e, "Consumer group recreate failed");
                            }
                        }
                        if self.sleep_or_cancel(&mut cancel, &mut backoff).await {
                            break 'outer;
                        }
                    }
                }
            };

            let acker = StreamAcker {
                conn: self.acks.clone(),
                key: key.clone(),
                group: self.queue.clone(),
                id: entry_id,
            };
            let delivery = Delivery::new(self.queue.clone(), message)
                .with_acker(Box::new(acker))
                .with_permit(permit);

            if tx.send(delivery).await.is_err() {
                // Consumer gone; the entry stays pending in the group
                break;
            }
        }
        tracing::debug!(queue = %self.queue, consumer = %self.consumer, "Redis consumer stopped");
    }

    /// Returns true if cancelled while waiting
    async fn sleep_or_cancel(
        &self,
        cancel: &mut oneshot::Receiver<()>,
        backoff: &mut Duration,
    ) -> bool {
        let wait = *backoff;
        *backoff = (*backoff * 2).min(self.config.max_backoff);
        tokio::select! {
            _ = cancel => true,
            _ = tokio::time::sleep(wait) => false,
        }
    }

    async fn read_one(
        &self,
        conn: &mut MultiplexedConnection,
        key: &str,
    ) -> Result<Option<(String, Message)>, BrokerError> {
        let reply: Option<StreamReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.queue)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(self.config.block.as_millis() as u64)
            .arg("STREAMS")
            .arg(key)
            .arg(">")
            .query_async(conn)
            .await?;

        let entry = reply
            .into_iter()
            .flatten()
            .flat_map(|(_, entries)| entries)
            .next();
        Ok(entry.map(|(id, fields)| (id, decode_entry(fields))))
    }
}

fn decode_entry(fields: Vec<(String, Vec<u8>)>) -> Message {
    let mut fields: HashMap<String, Vec<u8>> = fields.into_iter().collect();
    let mut text = |name: &str| fields.remove(name).and_then(|v| String::from_utf8(v).ok());
    let routing_key = text(FIELD_ROUTING_KEY).unwrap_or_default();
    let properties = Properties {
        correlation_id: text(FIELD_CORRELATION_ID),
        reply_to: text(FIELD_REPLY_TO),
        content_type: text(FIELD_CONTENT_TYPE),
    };
    let body = fields.remove(FIELD_BODY).unwrap_or_default();
    Message {
        routing_key,
        properties,
        body,
    }
}

struct StreamAcker {
    conn: ConnectionManager,
    key: String,
    group: String,
    id: String,
}

#[async_trait]
impl Acker for StreamAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: (i64, i64) = ack_pipeline(&self.key, &self.group, &self.id)
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))?;
        Ok(())
    }
}

/// `XACK` then `XDEL`. Each stream has a single group, so an acknowledged
/// entry is never read again.
fn ack_pipeline(key: &str, group: &str, id: &str) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("XACK")
        .arg(key)
        .arg(group)
        .arg(id)
        .cmd("XDEL")
        .arg(key)
        .arg(id);
    pipe
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_key() {
        let config = RedisStreamsConfig::new("redis://localhost", "warden");
        assert_eq!(config.stream_key("users.sign_in.request"), "warden:queue:users.sign_in.request");
    }

    #[test]
    fn test_decode_entry() {
        let message = decode_entry(vec![
            (FIELD_ROUTING_KEY.into(), b"users.logout.request".to_vec()),
            (FIELD_BODY.into(), b"{}".to_vec()),
            (FIELD_CORRELATION_ID.into(), b"abc".to_vec()),
        ]);
        assert_eq!(message.routing_key, "users.logout.request");
        assert_eq!(message.body, b"{}");
        assert_eq!(message.properties.correlation_id.as_deref(), Some("abc"));
        assert_eq!(message.properties.reply_to, None);
    }

    fn args(cmd: &redis::Cmd) -> Vec<String> {
        cmd.args_iter()
            .filter_map(|arg| match arg {
                redis::Arg::Simple(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                redis::Arg::Cursor => None,
            })
            .collect()
    }

    #[test]
    fn test_xadd_caps_stream_length() {
        let config = RedisStreamsConfig::new("redis://localhost", "warden").with_max_len(500);
        let props = Properties::json().with_correlation_id("abc");
        let args = args(&xadd(&config, "q", "users.sign_in.request", &props, b"{}"));

        assert_eq!(&args[..6], &["XADD", "warden:queue:q", "MAXLEN", "~", "500", "*"]);
        assert!(args.iter().any(|a| a == FIELD_CORRELATION_ID));
        assert!(!args.iter().any(|a| a == FIELD_REPLY_TO));
    }

    #[test]
    fn test_max_len_default_and_floor() {
        let config = RedisStreamsConfig::new("redis://localhost", "p");
        assert_eq!(config.max_len, RedisStreamsConfig::DEFAULT_MAX_LEN);
        assert_eq!(config.with_max_len(0).max_len, 1);
    }

    #[test]
    fn test_ack_deletes_entry() {
        let packed = ack_pipeline("warden:queue:q", "q", "1-0").get_packed_pipeline();
        let packed = String::from_utf8_lossy(&packed);

        let order: Vec<usize> = ["MULTI", "XACK", "XDEL", "EXEC"]
            .iter()
            .map(|word| packed.find(word).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{packed}");
        assert_eq!(packed.matches("1-0").count(), 2);
    }

    #[test]
    fn test_consumer_names_unique() {
        let a = RedisStreamsConfig::new("redis://localhost", "p");
        let b = RedisStreamsConfig::new("redis://localhost", "p");
        assert_ne!(a.consumer_name, b.consumer_name);
    }
}
