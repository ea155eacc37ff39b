//! Pending-call registry
//!
//! Maps correlation ids to the callers waiting on them. Insert happens on
//! the calling task and resolve on the reply listener, so the map is a
//! sharded [`DashMap`] and no lock is held across I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::RpcError;

#[derive(Default)]
struct Inner {
    pending: DashMap<String, oneshot::Sender<Vec<u8>>>,
    closed: AtomicBool,
}

/// Cheaply cloneable handle to the shared registry
#[derive(Clone, Default)]
pub struct CorrelationRegistry {
    inner: Arc<Inner>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start expecting a reply for `correlation_id`.
    ///
    /// Must happen before the request is published, otherwise a fast reply
    /// finds nothing to resolve and is dropped.
    pub fn register(&self, correlation_id: impl Into<String>) -> Result<PendingReply, RpcError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }
        let correlation_id = correlation_id.into();
        let (tx, rx) = oneshot::channel();
        match self.inner.pending.entry(correlation_id.clone()) {
            Entry::Occupied(_) => return Err(RpcError::DuplicateCorrelationId(correlation_id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        Ok(PendingReply {
            correlation_id,
            rx,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Hand a reply body to its waiting caller.
    ///
    /// Returns false when nobody is waiting: the id was already resolved,
    /// timed out, or never registered here.
    pub fn resolve(&self, correlation_id: &str, body: Vec<u8>) -> bool {
        match self.inner.pending.remove(correlation_id) {
            Some((_, tx)) => tx.send(body).is_ok(),
            None => false,
        }
    }

    /// Fail every pending call and refuse new registrations
    pub fn close_all(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let dropped = self.inner.pending.len();
        self.inner.pending.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Closed pending RPC calls");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of calls currently waiting
    pub fn len(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.pending.is_empty()
    }
}

impl std::fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("pending", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One registered call. Dropping it unresolved removes the registry entry.
#[derive(Debug)]
pub struct PendingReply {
    correlation_id: String,
    rx: oneshot::Receiver<Vec<u8>>,
    inner: Arc<Inner>,
}

impl PendingReply {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Wait for the reply body. Fails with [`RpcError::Closed`] if the
    /// registry is closed first.
    pub async fn recv(&mut self) -> Result<Vec<u8>, RpcError> {
        (&mut self.rx).await.map_err(|_| RpcError::Closed)
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.inner.pending.remove(&self.correlation_id);
    }
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner").field("pending", &self.pending.len()).finish()
    }
}
