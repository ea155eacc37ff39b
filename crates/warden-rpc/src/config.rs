//! Static broker topology for the users operations

use warden_broker::QueueBinding;
use warden_types::Operation;

pub const DEFAULT_EXCHANGE: &str = "users";
const ENV_PREFIX: &str = "RMQ_USERS_TRANSPORT";

/// Where one operation's requests and replies travel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBinding {
    pub operation: Operation,
    pub request_routing_key: String,
    pub request_queue: String,
    pub reply_routing_key: String,
    pub reply_queue: String,
}

impl OperationBinding {
    /// `users.<op>.request` / `users.<op>.reply`, used for both routing key and queue
    pub fn default_for(operation: Operation) -> Self {
        let request = format!("{DEFAULT_EXCHANGE}.{}.request", operation.as_str());
        let reply = format!("{DEFAULT_EXCHANGE}.{}.reply", operation.as_str());
        Self {
            operation,
            request_routing_key: request.clone(),
            request_queue: request,
            reply_routing_key: reply.clone(),
            reply_queue: reply,
        }
    }
}

/// One exchange plus a binding per operation. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcTopology {
    pub exchange: String,
    bindings: Vec<OperationBinding>,
}

impl Default for RpcTopology {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            bindings: Operation::ALL.iter().map(|op| OperationBinding::default_for(*op)).collect(),
        }
    }
}

impl RpcTopology {
    /// Read `RMQ_USERS_TRANSPORT_*` variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}_{suffix}")).filter(|v| !v.is_empty());

        let exchange = var("EXCHANGE").unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());
        let bindings = Operation::ALL
            .iter()
            .map(|op| {
                let defaults = OperationBinding::default_for(*op);
                let prefix = op.env_prefix();
                OperationBinding {
                    operation: *op,
                    request_routing_key: var(&format!("{prefix}_REQUEST_RK"))
                        .unwrap_or(defaults.request_routing_key),
                    request_queue: var(&format!("{prefix}_REQUEST_QUEUE"))
                        .unwrap_or(defaults.request_queue),
                    reply_routing_key: var(&format!("{prefix}_REPLY_RK"))
                        .unwrap_or(defaults.reply_routing_key),
                    reply_queue: var(&format!("{prefix}_REPLY_QUEUE"))
                        .unwrap_or(defaults.reply_queue),
                }
            })
            .collect();

        Self { exchange, bindings }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// Replace one operation's binding
    pub fn with_binding(mut self, binding: OperationBinding) -> Self {
        self.bindings.retain(|b| b.operation != binding.operation);
        self.bindings.push(binding);
        self
    }

    pub fn binding(&self, operation: Operation) -> Option<&OperationBinding> {
        self.bindings.iter().find(|b| b.operation == operation)
    }

    pub fn bindings(&self) -> &[OperationBinding] {
        &self.bindings
    }

    /// Reply queues without duplicates, in binding order
    pub fn reply_queues(&self) -> Vec<&str> {
        let mut queues: Vec<&str> = Vec::new();
        for binding in &self.bindings {
            if !queues.contains(&binding.reply_queue.as_str()) {
                queues.push(&binding.reply_queue);
            }
        }
        queues
    }

    /// Every request and reply queue bound to the exchange
    pub fn queue_bindings(&self) -> Vec<QueueBinding> {
        self.bindings
            .iter()
            .flat_map(|b| {
                [
                    QueueBinding::new(&self.exchange, &b.request_queue, &b.request_routing_key),
                    QueueBinding::new(&self.exchange, &b.reply_queue, &b.reply_routing_key),
                ]
            })
            .collect()
    }
}
