pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod display;
pub mod error;
pub mod types;
pub mod watcher;
pub mod web;

pub use crate::core::{ConfigManager, QueueApi, QueueClient};
pub use crate::error::{ApiError, WatchError};
pub use crate::watcher::{QueueWatcher, WatcherPhase};
pub use crate::web::start_web_server;
