// src/core/mod.rs
//! Configuration and queue server transport

pub mod config_manager;
pub mod service_client;

pub use config_manager::{ApiConfig, AuthSourcesConfig, ConfigManager, LoggingConfig, WatcherConfig};
pub use service_client::{QueueApi, QueueClient};
