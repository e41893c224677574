//! Shared startup for the command-line front ends

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::App;
use crate::chat::RenderMode;
use crate::config::Config;

/// Chat with a hosted chat-completions model; history persists between runs
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (defaults to ~/.config/agent-chat/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Conversation to resume
    #[arg(short, long, env = "AGENT_CHAT_SESSION_ID")]
    pub session_id: Option<String>,

    /// Session store file
    #[arg(short = 'f', long, env = "AGENT_CHAT_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the chat-completions endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// Clear the session's history before the first prompt
    #[arg(long)]
    pub reset: bool,
}

impl Args {
    /// Resolve the config file, then apply CLI overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(ref id) = self.session_id {
            config.session.id = id.clone();
        }
        if let Some(ref path) = self.session_file {
            config.session.path = path.clone();
        }
        if let Some(ref model) = self.model {
            config.model.name = model.clone();
        }
        if let Some(ref base_url) = self.base_url {
            config.model.base_url = base_url.clone();
        }
    }
}

/// Set up file-based logging; stdout carries the conversation
fn init_logging(config: &Config) -> Result<()> {
    let log_file = std::fs::File::create(&config.general.log_file).with_context(|| {
        format!(
            "Failed to create log file: {}",
            config.general.log_file.display()
        )
    })?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(log_file).with_ansi(false))
        .init();
    Ok(())
}

/// Entry point shared by both binaries
pub async fn run(mode: RenderMode) -> Result<()> {
    // Load .env files (local first, then home directory)
    // Errors are ignored - files are optional
    let _ = dotenvy::from_filename(".env");
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".env"));
    }

    let args = Args::parse();
    let config = args.load_config()?;
    init_logging(&config)?;
    info!("Starting in {:?} mode", mode);

    let app = App::new(config, mode)?;
    if args.reset {
        app.session()
            .clear_session()
            .await
            .context("Failed to reset session")?;
        info!("Session {} cleared", app.session().session_id());
    }

    let turns = app.run().await?;
    info!("Exiting after {} turns", turns);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "agent-chat",
            "--session-id",
            "work",
            "-f",
            "/tmp/history.json",
            "--model",
            "gemini-2.5-flash",
            "--reset",
        ])
        .unwrap();
        assert_eq!(args.session_id.as_deref(), Some("work"));
        assert_eq!(args.session_file, Some(PathBuf::from("/tmp/history.json")));
        assert!(args.reset);
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = Args {
            session_id: Some("work".to_string()),
            model: Some("gemini-2.5-flash".to_string()),
            ..Args::default()
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.session.id, "work");
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert_eq!(config.session.path, Config::default().session.path);
        assert_eq!(config.model.base_url, Config::default().model.base_url);
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nid = \"from-file\"\nhistory_limit = 6\n").unwrap();

        let args = Args {
            config: Some(path),
            ..Args::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.session.id, "from-file");
        assert_eq!(config.session.history_limit, Some(6));
    }
}
