use anyhow::{Context, Result};
use clap::Parser;
use job_tracker::cli::{Cli, Command};
use job_tracker::commands::{self, build_client, build_token_provider};
use job_tracker::web::ServerConfig;
use job_tracker::{start_web_server, ConfigManager};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_tracker=info,jobtrack=info"))
}

// Client commands own the terminal, so their logs go to a file
fn init_file_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true) // Clear file on startup
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(env_filter())
        .init();
    Ok(())
}

fn init_stdout_logging() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }

    if let Command::Serve {
        address,
        port,
        api_token,
        long_poll_timeout_secs,
        step_delay_ms,
        no_simulate,
    } = cli.command
    {
        init_stdout_logging();
        return start_web_server(ServerConfig {
            address,
            port,
            api_token,
            long_poll_timeout_ms: long_poll_timeout_secs * 1000,
            simulate: !no_simulate,
            step_delay_ms,
        })
        .await;
    }

    init_file_logging(&config.logging.file)?;
    info!("Queue server: {}", config.api.base_url);

    let api = build_client(&config)?;
    let tokens = build_token_provider(&config, cli.token);

    match cli.command {
        Command::Watch => commands::run_watch(&config, api, tokens).await,
        Command::Refresh => commands::run_refresh(&config, api, tokens).await,
        Command::Enqueue {
            url,
            priority,
            html,
        } => {
            commands::run_enqueue(&config, api, tokens, url, priority, html.as_deref()).await
        }
        Command::Serve { .. } => Ok(()),
    }
}
