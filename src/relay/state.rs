use std::sync::Arc;
use std::time::Instant;

use super::hub::{ConnectionHub, HubConfig};
use crate::client::ApiClient;
use crate::vision::TrackerConfig;

/// Shared state of the relay handlers
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<ServerConfig>,
    pub hub: Arc<ConnectionHub>,
    /// Backend used to validate tokens; required when `require_auth`
    pub auth: Option<ApiClient>,
    pub start_time: Instant,
}

impl RelayState {
    pub fn new(config: ServerConfig, auth: Option<ApiClient>) -> Self {
        let hub = ConnectionHub::new(HubConfig {
            max_connections: config.max_connections,
        });
        Self {
            config: Arc::new(config),
            hub: Arc::new(hub),
            auth,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Relay server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Validate `?token=` against the backend before upgrading
    pub require_auth: bool,
    pub max_connections: usize,
    /// Starting tracker settings for each connection
    pub tracker: TrackerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            require_auth: false,
            max_connections: HubConfig::default().max_connections,
            tracker: TrackerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
