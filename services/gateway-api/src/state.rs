//! Application state

use std::sync::Arc;

use warden_rpc::RpcClient;

use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Client for the users service
    pub rpc: Arc<RpcClient>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(rpc: Arc<RpcClient>, config: Config) -> Self {
        Self {
            rpc,
            config: Arc::new(config),
        }
    }
}
