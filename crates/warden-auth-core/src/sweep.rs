//! Background removal of expired token records
//!
//! Storage reclamation only. Expiry is enforced by verification whether or
//! not a record has been swept yet.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time;
use warden_db::TokenRepository;

use crate::clock::{Clock, SystemClock};
use crate::AuthError;

pub struct TokenSweeper<T: TokenRepository> {
    repo: Arc<T>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl<T: TokenRepository + 'static> TokenSweeper<T> {
    pub fn new(repo: Arc<T>, interval: Duration) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            interval,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Delete every record already expired at the clock's "now"
    pub async fn sweep_once(&self) -> Result<u64, AuthError> {
        let deleted = self.repo.delete_expired(self.clock.now()).await?;
        if deleted > 0 {
            tracing::info!(deleted_count = deleted, "Swept expired token records");
        } else {
            tracing::debug!("No expired token records to sweep");
        }
        Ok(deleted)
    }

    /// Run on the configured interval until the handle is shut down.
    /// The first sweep happens immediately.
    pub fn spawn(self) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.interval.as_secs(),
                "Starting token sweeper"
            );
            let mut interval = time::interval(self.interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            tracing::error!(error = %e, "Token sweep failed");
                        }
                    }
                }
            }
            tracing::info!("Token sweeper stopped");
        });
        SweeperHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Handle for the background sweeper task
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the loop and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = self.task.await;
    }
}
