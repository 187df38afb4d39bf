// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Follow and feed the job extraction queue")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Queue server base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token, tried before the configured sources
    #[arg(long, global = true, env = "JOBTRACK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Live view of the extraction queue (stdin: p pause, s resume, r reconnect, q quit)
    Watch,
    /// Print one snapshot of the queue
    Refresh,
    /// Submit a job posting for extraction
    Enqueue {
        url: String,
        #[arg(long, default_value_t = 1)]
        priority: i32,
        /// HTML already captured from the posting page
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Run the local sandbox queue server
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        address: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Token clients must send
        #[arg(long, default_value = "dev-token")]
        api_token: String,
        #[arg(long, default_value_t = 25)]
        long_poll_timeout_secs: u64,
        #[arg(long, default_value_t = 1500)]
        step_delay_ms: u64,
        /// Keep items where they are instead of simulating progress
        #[arg(long)]
        no_simulate: bool,
    },
}

/// Host commands read from stdin while watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Queue view hidden
    Pause,
    /// Queue view shown again
    Resume,
    /// User focused the queue view
    Reconnect,
    Quit,
}

impl HostCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" | "hide" => Some(HostCommand::Pause),
            "s" | "start" | "resume" | "show" => Some(HostCommand::Resume),
            "r" | "reconnect" | "focus" => Some(HostCommand::Reconnect),
            "q" | "quit" | "exit" => Some(HostCommand::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_command_parse() {
        assert_eq!(HostCommand::parse("p"), Some(HostCommand::Pause));
        assert_eq!(HostCommand::parse(" Show \n"), Some(HostCommand::Resume));
        assert_eq!(HostCommand::parse("r"), Some(HostCommand::Reconnect));
        assert_eq!(HostCommand::parse("quit"), Some(HostCommand::Quit));
        assert_eq!(HostCommand::parse("x"), None);
    }

    #[test]
    fn test_enqueue_args() {
        let cli = Cli::try_parse_from([
            "jobtrack",
            "enqueue",
            "https://a.com/job",
            "--priority",
            "3",
            "--api-url",
            "http://q.local",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://q.local"));
        match cli.command {
            Command::Enqueue { url, priority, html } => {
                assert_eq!(url, "https://a.com/job");
                assert_eq!(priority, 3);
                assert!(html.is_none());
            }
            _ => panic!("expected enqueue"),
        }
    }
}
