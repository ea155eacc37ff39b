//! RPC errors

use std::time::Duration;

use thiserror::Error;
use warden_broker::BrokerError;
use warden_types::Operation;

/// Failures of the RPC layer itself.
///
/// Business rejections never show up here; they travel inside a
/// well-formed [`warden_types::Reply`].
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("publish failed: {0}")]
    Publish(#[source] BrokerError),

    #[error("subscribe failed: {0}")]
    Subscribe(#[source] BrokerError),

    #[error("declare failed: {0}")]
    Declare(#[source] BrokerError),

    /// The registry or transport was shut down while the call was pending
    #[error("rpc layer closed")]
    Closed,

    #[error("correlation id {0} is already pending")]
    DuplicateCorrelationId(String),

    #[error("operation {0} has no binding")]
    UnboundOperation(Operation),

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode reply: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RpcError {
    /// Whether the remote side could not be reached at all, as opposed to
    /// a local programming or decoding problem
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Publish(_) | Self::Subscribe(_) | Self::Declare(_) | Self::Closed
        )
    }
}

/// Failure returned by an operation handler. Both variants become a reply
/// with `data: null` and the messages in `errors`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Expected business rejection
    #[error("{}", .0.join("; "))]
    Domain(Vec<String>),

    /// Anything unexpected
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(vec![message.into()])
    }

    pub fn into_messages(self) -> Vec<String> {
        match self {
            Self::Domain(messages) => messages,
            Self::Internal(message) => vec![message],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_errors() {
        assert!(RpcError::Timeout(Duration::from_millis(10)).is_unavailable());
        assert!(RpcError::Closed.is_unavailable());
        assert!(RpcError::Publish(BrokerError::Closed).is_unavailable());
        assert!(!RpcError::UnboundOperation(Operation::Logout).is_unavailable());
    }

    #[test]
    fn test_handler_error_messages() {
        let err = HandlerError::Domain(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "a; b");
        assert_eq!(err.into_messages(), vec!["a", "b"]);
        assert_eq!(HandlerError::Internal("boom".into()).into_messages(), vec!["boom"]);
    }
}
