// src/commands.rs
//! Host side of the CLI: wires the watcher, the client and the console

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::auth::{AuthTokenProvider, StaticToken, TokenChain};
use crate::cli::HostCommand;
use crate::core::{ConfigManager, QueueApi, QueueClient};
use crate::display::ConsoleSink;
use crate::error::{ApiError, WatchError};
use crate::types::{EnqueueOutcome, EnqueueRequest};
use crate::watcher::{QueueWatcher, WatcherPhase};

pub fn build_client(config: &ConfigManager) -> Result<Arc<dyn QueueApi>> {
    let client = QueueClient::with_timeout(&config.api.base_url, config.api.request_timeout())
        .context("Failed to create HTTP client")?;
    Ok(Arc::new(client))
}

/// `--token` first, then cookie, persisted storage and app page storage
pub fn build_token_provider(
    config: &ConfigManager,
    cli_token: Option<String>,
) -> Arc<dyn AuthTokenProvider> {
    let mut chain = TokenChain::from_config(&config.auth, &config.api);
    if let Some(token) = cli_token {
        chain = chain.with_first(StaticToken::new(token));
    }
    chain.into_provider()
}

pub async fn run_watch(
    config: &ConfigManager,
    api: Arc<dyn QueueApi>,
    tokens: Arc<dyn AuthTokenProvider>,
) -> Result<()> {
    let sink = Arc::new(ConsoleSink::new(config.api.app_url.clone()));
    let watcher = QueueWatcher::new(api, tokens, sink, config.watcher.clone());

    println!(
        "Watching extraction queue at {} (p pause, s resume, r reconnect, q quit)",
        config.api.base_url
    );
    watch_with_input(&watcher, BufReader::new(tokio::io::stdin())).await
}

/// Drives `watcher` from host commands read line by line from `input`.
/// Ends on `q`, end of input or Ctrl-C, and fails once authentication is lost.
pub async fn watch_with_input<R>(watcher: &QueueWatcher, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut phase = watcher.subscribe();
    let mut lines = input.lines();
    watcher.start();

    let outcome = loop {
        tokio::select! {
            changed = phase.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                if *phase.borrow_and_update() == WatcherPhase::AuthLost {
                    error!("Watcher halted: authentication lost");
                    break Err(anyhow::anyhow!("Session expired or missing: log in again, then rerun watch"));
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Input closed");
                        break Ok(());
                    }
                    Err(e) => break Err(anyhow::Error::new(e).context("Failed to read stdin")),
                };
                match HostCommand::parse(&line) {
                    Some(HostCommand::Pause) => {
                        watcher.stop();
                        println!("Paused");
                    }
                    Some(HostCommand::Resume) => watcher.start(),
                    Some(HostCommand::Reconnect) => watcher.force_reconnect(),
                    Some(HostCommand::Quit) => break Ok(()),
                    None if line.trim().is_empty() => {}
                    None => println!("Unknown command: {}", line.trim()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break Ok(());
            }
        }
    };

    watcher.stop();
    outcome
}

pub async fn run_refresh(
    config: &ConfigManager,
    api: Arc<dyn QueueApi>,
    tokens: Arc<dyn AuthTokenProvider>,
) -> Result<()> {
    let sink = Arc::new(ConsoleSink::new(config.api.app_url.clone()));
    let watcher = QueueWatcher::new(api, tokens, sink, config.watcher.clone());

    match watcher.refresh_once().await {
        Ok(_) => Ok(()),
        Err(WatchError::MissingToken) => {
            anyhow::bail!("Not logged in: pass --token or configure a token source")
        }
        Err(WatchError::Api(ApiError::Unauthorized)) => {
            anyhow::bail!("Session expired: log in again")
        }
        Err(e) => Err(e).context("Failed to refresh queue"),
    }
}

pub async fn run_enqueue(
    config: &ConfigManager,
    api: Arc<dyn QueueApi>,
    tokens: Arc<dyn AuthTokenProvider>,
    url: String,
    priority: i32,
    html: Option<&Path>,
) -> Result<()> {
    let pre_extracted_html = match html {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read HTML file: {}", path.display()))?,
        ),
        None => None,
    };

    let token = tokens
        .token()
        .await
        .context("Not logged in: pass --token or configure a token source")?;

    let request = EnqueueRequest {
        url,
        priority,
        pre_extracted_html,
    };

    let outcome = match api.enqueue(&token, &request).await {
        Ok(outcome) => outcome,
        Err(ApiError::Unauthorized) => anyhow::bail!("Session expired: log in again"),
        Err(e) => {
            error!("Enqueue failed: {}", e);
            return Err(e).context("Failed to enqueue job posting");
        }
    };

    let app_url = config.api.app_url.trim_end_matches('/');
    match outcome {
        EnqueueOutcome::Queued(_) => {
            println!("Queued {}", request.url);
            let sink = Arc::new(ConsoleSink::new(app_url));
            let watcher = QueueWatcher::new(api, tokens, sink, config.watcher.clone());
            if let Err(e) = watcher.refresh_once().await {
                error!("Queue refresh after enqueue failed: {}", e);
            }
        }
        EnqueueOutcome::Duplicate(duplicate) => {
            println!("Already extracted: {}", duplicate.message);
            if let Some(link) = duplicate.job_link() {
                println!("  Open: {}{}", app_url, link);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ViewSink;
    use crate::types::QueueItem;
    use async_trait::async_trait;
    use tokio::io::AsyncWriteExt;

    struct FixedReply(fn() -> Result<Vec<QueueItem>, ApiError>);

    #[async_trait]
    impl QueueApi for FixedReply {
        async fn fetch_queue(&self, _token: &str) -> Result<Vec<QueueItem>, ApiError> {
            (self.0)()
        }

        async fn watch_queue(&self, _token: &str) -> Result<Vec<QueueItem>, ApiError> {
            (self.0)()
        }

        async fn enqueue(
            &self,
            _token: &str,
            _request: &EnqueueRequest,
        ) -> Result<EnqueueOutcome, ApiError> {
            Ok(EnqueueOutcome::Queued(serde_json::Value::Null))
        }
    }

    fn watcher(reply: fn() -> Result<Vec<QueueItem>, ApiError>) -> QueueWatcher {
        QueueWatcher::new(
            Arc::new(FixedReply(reply)),
            Arc::new(StaticToken::new("tok")),
            Arc::new(ViewSink::new()),
            ConfigManager::default().watcher,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_fails_when_auth_is_lost() {
        let watcher = watcher(|| Err(ApiError::Unauthorized));
        // keep the writer alive so input stays open
        let (_writer, reader) = tokio::io::duplex(64);

        let result = watch_with_input(&watcher, BufReader::new(reader)).await;

        assert!(result.is_err());
        assert_eq!(watcher.phase(), WatcherPhase::AuthLost);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_quits_on_command() {
        let watcher = watcher(|| Ok(Vec::new()));
        let (mut writer, reader) = tokio::io::duplex(64);
        writer.write_all(b"p\ns\nq\n").await.unwrap();

        watch_with_input(&watcher, BufReader::new(reader)).await.unwrap();

        assert!(!watcher.is_active());
        assert_eq!(watcher.phase(), WatcherPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_ends_cleanly_on_closed_input() {
        let watcher = watcher(|| Ok(Vec::new()));

        watch_with_input(&watcher, BufReader::new(tokio::io::empty()))
            .await
            .unwrap();

        assert!(!watcher.is_active());
    }
}
