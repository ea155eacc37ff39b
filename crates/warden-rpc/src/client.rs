//! Calling side of the RPC layer

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;
use warden_broker::{ConsumeOptions, Properties, SharedTransport, Subscription};
use warden_types::{Operation, Reply};

use crate::{CorrelationRegistry, RpcError, RpcTopology};

/// Client tuning
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Used by [`RpcClient::call`]
    pub default_timeout: Duration,
    /// Prefetch of each reply-queue subscription
    pub prefetch: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            prefetch: 16,
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// Request/reply client.
///
/// One listener per reply queue feeds the shared [`CorrelationRegistry`];
/// each call registers its id, publishes, and waits. Calls are attempted
/// exactly once; retrying is up to the caller.
pub struct RpcClient {
    transport: SharedTransport,
    topology: Arc<RpcTopology>,
    registry: CorrelationRegistry,
    options: ClientOptions,
    shutdown_tx: watch::Sender<bool>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl RpcClient {
    /// Declare the topology and start listening on every reply queue
    pub async fn start(
        transport: SharedTransport,
        topology: RpcTopology,
        options: ClientOptions,
    ) -> Result<Self, RpcError> {
        transport
            .declare(&topology.queue_bindings())
            .await
            .map_err(RpcError::Declare)?;

        let registry = CorrelationRegistry::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut listeners = Vec::new();
        for queue in topology.reply_queues() {
            let subscription = transport
                .subscribe(queue, ConsumeOptions::prefetch(options.prefetch))
                .await
                .map_err(RpcError::Subscribe)?;
            listeners.push(tokio::spawn(listen(
                subscription,
                registry.clone(),
                shutdown_rx.clone(),
            )));
        }

        tracing::info!(
            exchange = %topology.exchange,
            reply_queues = listeners.len(),
            "RPC client started"
        );

        Ok(Self {
            transport,
            topology: Arc::new(topology),
            registry,
            options,
            shutdown_tx,
            listeners: Mutex::new(listeners),
        })
    }

    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    pub fn topology(&self) -> &RpcTopology {
        &self.topology
    }

    pub fn default_timeout(&self) -> Duration {
        self.options.default_timeout
    }

    /// [`Self::call_with_timeout`] with the configured default timeout
    pub async fn call<Req, Res>(&self, operation: Operation, payload: &Req) -> Result<Reply<Res>, RpcError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.call_with_timeout(operation, payload, self.options.default_timeout)
            .await
    }

    /// Publish one request and wait up to `timeout` for its reply.
    ///
    /// A business rejection comes back as `Ok` with `errors` set; `Err`
    /// means the call itself failed.
    pub async fn call_with_timeout<Req, Res>(
        &self,
        operation: Operation,
        payload: &Req,
        timeout: Duration,
    ) -> Result<Reply<Res>, RpcError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let binding = self
            .topology
            .binding(operation)
            .ok_or(RpcError::UnboundOperation(operation))?;
        let body = serde_json::to_vec(payload).map_err(RpcError::Encode)?;

        let correlation_id = Uuid::new_v4().to_string();
        // Registered before publishing; the guard removes the entry on every exit path
        let mut pending = self.registry.register(correlation_id.clone())?;

        let properties = Properties::json()
            .with_correlation_id(&correlation_id)
            .with_reply_to(&binding.reply_queue);
        self.transport
            .publish(&self.topology.exchange, &binding.request_routing_key, properties, body)
            .await
            .map_err(|e| {
                tracing::warn!(operation = %operation, error = %e, "RPC publish failed");
                RpcError::Publish(e)
            })?;

        tracing::debug!(operation = %operation, correlation_id = %correlation_id, "RPC request sent");

        let reply = match tokio::time::timeout(timeout, pending.recv()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    operation = %operation,
                    correlation_id = %correlation_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "RPC call timed out"
                );
                return Err(RpcError::Timeout(timeout));
            }
        };

        serde_json::from_slice(&reply).map_err(RpcError::Decode)
    }

    /// Stop the reply listeners and fail every pending call
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let listeners = std::mem::take(&mut *self.listeners.lock().await);
        for listener in listeners {
            let _ = listener.await;
        }
        self.registry.close_all();
        tracing::info!("RPC client stopped");
    }
}

async fn listen(
    mut subscription: Subscription,
    registry: CorrelationRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let mut delivery = tokio::select! {
            _ = shutdown.changed() => break,
            delivery = subscription.next() => match delivery {
                Some(delivery) => delivery,
                None => break,
            },
        };

        match delivery.correlation_id().map(str::to_owned) {
            Some(id) => {
                let body = std::mem::take(&mut delivery.message.body);
                if !registry.resolve(&id, body) {
                    tracing::debug!(
                        queue = %delivery.queue,
                        correlation_id = %id,
                        "Discarded reply with no pending call"
                    );
                }
            }
            None => {
                tracing::warn!(queue = %delivery.queue, "Discarded reply without correlation id");
            }
        }

        if let Err(e) = delivery.ack().await {
            tracing::warn!(error = %e, "Failed to acknowledge reply");
        }
    }
    subscription.cancel().await;
}
