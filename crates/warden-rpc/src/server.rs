//! Serving side of the RPC layer
//!
//! Handlers are registered explicitly per [`Operation`]. Every inbound
//! request is answered with exactly one reply envelope and acknowledged,
//! whatever the handler does: redelivering a half-processed sign-up is
//! worse than reporting the failure.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use warden_broker::{ConsumeOptions, Delivery, Properties, SharedTransport, Subscription};
use warden_types::{Operation, Reply};

use crate::{HandlerError, OperationBinding, RpcError, RpcTopology};

type HandlerResult = Result<serde_json::Value, HandlerError>;
type BoxedHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

const MALFORMED_REQUEST: &str = "Malformed request payload";
const INTERNAL_ERROR: &str = "Internal server error";

/// Operation → handler table plus the transport it serves on
pub struct RpcServer {
    transport: SharedTransport,
    topology: Arc<RpcTopology>,
    routes: HashMap<Operation, BoxedHandler>,
    prefetch: usize,
}

impl RpcServer {
    pub fn new(transport: SharedTransport, topology: RpcTopology) -> Self {
        Self {
            transport,
            topology: Arc::new(topology),
            routes: HashMap::new(),
            prefetch: 1,
        }
    }

    /// Maximum requests in flight per operation queue
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch.max(1);
        self
    }

    /// Register the handler for `operation`, replacing any earlier one.
    ///
    /// The request body is decoded into `Req` before the handler runs; a
    /// body that does not decode is answered with an error reply.
    pub fn route<Req, Res, F, Fut>(mut self, operation: Operation, handler: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let boxed: BoxedHandler = Arc::new(move |body: Vec<u8>| {
            let handler = Arc::clone(&handler);
            async move {
                let request: Req = serde_json::from_slice(&body).map_err(|e| {
                    tracing::debug!(operation = %operation, error = %e, "Undecodable request");
                    HandlerError::domain(MALFORMED_REQUEST)
                })?;
                let response = (*handler)(request).await?;
                serde_json::to_value(response).map_err(|e| HandlerError::Internal(e.to_string()))
            }
            .boxed()
        });
        self.routes.insert(operation, boxed);
        self
    }

    /// Declare the topology, subscribe every routed request queue and start
    /// dispatching
    pub async fn serve(self) -> Result<ServerHandle, RpcError> {
        self.transport
            .declare(&self.topology.queue_bindings())
            .await
            .map_err(RpcError::Declare)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut workers = Vec::with_capacity(self.routes.len());

        for (operation, handler) in self.routes {
            let binding = self
                .topology
                .binding(operation)
                .cloned()
                .ok_or(RpcError::UnboundOperation(operation))?;
            let subscription = self
                .transport
                .subscribe(&binding.request_queue, ConsumeOptions::prefetch(self.prefetch))
                .await
                .map_err(RpcError::Subscribe)?;

            tracing::info!(
                operation = %operation,
                queue = %binding.request_queue,
                prefetch = self.prefetch,
                "Serving RPC operation"
            );

            let worker = Worker {
                transport: Arc::clone(&self.transport),
                exchange: self.topology.exchange.clone(),
                binding,
                handler,
            };
            workers.push(tokio::spawn(worker.run(subscription, shutdown_rx.clone())));
        }

        Ok(ServerHandle {
            shutdown_tx,
            workers,
        })
    }
}

/// Running server; stop it with [`ServerHandle::shutdown`]
pub struct ServerHandle {
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop consuming and wait for in-flight requests to be answered
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for worker in self.workers {
            let _ = worker.await;
        }
        tracing::info!("RPC server stopped");
    }
}

struct Worker {
    transport: SharedTransport,
    exchange: String,
    binding: OperationBinding,
    handler: BoxedHandler,
}

impl Worker {
    async fn run(self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        let worker = Arc::new(self);
        let mut in_flight = JoinSet::new();

        loop {
            let delivery = tokio::select! {
                _ = shutdown.changed() => break,
                Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!(error = %e, "RPC dispatch task failed");
                    }
                    continue;
                }
                delivery = subscription.next() => match delivery {
                    Some(delivery) => delivery,
                    None => break,
                },
            };
            // The delivery holds a prefetch slot, so this stays bounded
            in_flight.spawn(Arc::clone(&worker).dispatch(delivery));
        }

        subscription.cancel().await;
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                tracing::error!(error = %e, "RPC dispatch task failed");
            }
        }
    }

    async fn dispatch(self: Arc<Self>, mut delivery: Delivery) {
        let operation = self.binding.operation;
        let correlation_id = delivery.correlation_id().map(str::to_owned);
        let reply_to = delivery.reply_to().map(str::to_owned);
        let body = std::mem::take(&mut delivery.message.body);

        let outcome = AssertUnwindSafe((self.handler)(body))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(HandlerError::Internal(INTERNAL_ERROR.to_string())));

        let reply = match outcome {
            Ok(data) => Reply::ok(data),
            Err(HandlerError::Domain(errors)) => {
                tracing::debug!(operation = %operation, ?errors, "RPC request rejected");
                Reply::errors(errors)
            }
            Err(HandlerError::Internal(message)) => {
                tracing::error!(operation = %operation, error = %message, "RPC handler failed");
                Reply::error(message)
            }
        };

        let body = serde_json::to_vec(&reply).unwrap_or_else(|e| {
            tracing::error!(operation = %operation, error = %e, "Failed to encode reply");
            serde_json::to_vec(&Reply::<()>::error(INTERNAL_ERROR)).unwrap_or_default()
        });

        let mut properties = Properties::json();
        match &correlation_id {
            Some(id) => properties = properties.with_correlation_id(id),
            None => tracing::warn!(operation = %operation, "Request without correlation id"),
        }

        let sent = match reply_to {
            Some(queue) => self.transport.send_to_queue(&queue, properties, body).await,
            None => {
                self.transport
                    .publish(&self.exchange, &self.binding.reply_routing_key, properties, body)
                    .await
            }
        };
        if let Err(e) = sent {
            tracing::warn!(operation = %operation, error = %e, "Failed to send RPC reply");
        }

        // Acknowledged even when the reply could not be sent
        if let Err(e) = delivery.ack().await {
            tracing::warn!(operation = %operation, error = %e, "Failed to acknowledge request");
        }
    }
}
