//! # AEO Visibility CLI (`aeo`)
//!
//! Starts the share-of-voice dashboard and scaffolds its configuration.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `aeo init` | Write an example configuration file |
//! | `aeo serve` | Start the dashboard HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Create ./config/aeo.toml
//! aeo init
//!
//! # Serve on the configured address with JSON progress lines on stderr
//! aeo serve --progress json
//!
//! # Serve a second brand on another port
//! aeo --config ./config/other.toml serve --bind 127.0.0.1:8502
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aeo_visibility::config::{self, Config, EXAMPLE_CONFIG};
use aeo_visibility::logging;
use aeo_visibility::progress::ProgressMode;
use aeo_visibility::server;

const DEFAULT_CONFIG_PATH: &str = "./config/aeo.toml";

/// AEO Visibility: measure a brand's share of voice in AI shopping answers.
#[derive(Parser)]
#[command(
    name = "aeo",
    about = "AEO Visibility: measure a brand's share of voice in AI shopping answers",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/aeo.toml`. When the default file does not
    /// exist, built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example configuration file.
    ///
    /// Refuses to overwrite an existing file.
    Init,

    /// Start the dashboard HTTP server.
    Serve {
        /// Address to bind, overriding `[server].bind`.
        #[arg(long)]
        bind: Option<String>,

        /// Progress output for analysis runs: `human`, `json`, `log` or `off`.
        /// Defaults to `human` when stderr is a terminal, `log` otherwise.
        #[arg(long, value_parser = parse_progress_mode)]
        progress: Option<ProgressMode>,
    },
}

fn parse_progress_mode(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}': use human, json, log or off", s))
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote example config to {}", path.display());
    Ok(())
}

fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => config::load_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                config::load_config(path)
            } else {
                tracing::warn!(
                    path = DEFAULT_CONFIG_PATH,
                    "config file not found, using built-in defaults"
                );
                Ok(Config::minimal())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    match cli.command {
        Commands::Init => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            init_config(&path)?;
        }
        Commands::Serve { bind, progress } => {
            let cfg = resolve_config(cli.config.as_deref())?;
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            server::run_server(&cfg, &bind, Arc::from(reporter)).await?;
        }
    }

    Ok(())
}
