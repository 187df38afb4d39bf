// src/web/types.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Bearer token clients must present
    pub api_token: String,
    /// How long a watch request is held open without changes
    pub long_poll_timeout_ms: u64,
    /// Drive enqueued items through simulated extraction steps
    pub simulate: bool,
    pub step_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8000,
            api_token: "dev-token".to_string(),
            long_poll_timeout_ms: 25_000,
            simulate: true,
            step_delay_ms: 1500,
        }
    }
}

impl ServerConfig {
    pub fn long_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.long_poll_timeout_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: String,
}

impl ErrorBody {
    pub fn new(error: &str, error_code: &str) -> Self {
        Self {
            error: error.to_string(),
            error_code: error_code.to_string(),
        }
    }
}
