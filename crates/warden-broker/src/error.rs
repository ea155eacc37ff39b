//! Broker errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    /// Broker unreachable or connection lost
    #[error("connection error: {0}")]
    Connection(String),

    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("acknowledge failed: {0}")]
    Ack(String),

    /// The transport has been closed
    #[error("transport closed")]
    Closed,

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl BrokerError {
    /// Whether retrying after a reconnect could help
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Closed => true,
            Self::Redis(e) => e.is_io_error() || e.is_connection_dropped() || e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_classification() {
        assert!(BrokerError::Connection("refused".into()).is_connection());
        assert!(BrokerError::Closed.is_connection());
        assert!(!BrokerError::UnknownQueue("q".into()).is_connection());

        let io = redis::RedisError::from(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));
        assert!(BrokerError::from(io).is_connection());

        let reply = redis::RedisError::from((redis::ErrorKind::ResponseError, "NOGROUP"));
        assert!(!BrokerError::from(reply).is_connection());
    }
}
