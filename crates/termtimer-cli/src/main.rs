#![deny(unsafe_code)]

//! termtimer CLI: daemon runner and interactive front-end.

mod launcher;
mod shell;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use termtimer_config::AppConfig;
use termtimer_core::build_info;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// termtimer: countdown timers that nag until you look.
///
/// Without arguments, starts the daemon if needed and opens an interactive
/// prompt. With arguments, runs them as a single command and exits.
#[derive(Parser)]
#[command(
    name = "termtimer",
    version = build_info::LONG_VERSION,
    about,
    disable_help_subcommand = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground.
    Daemon,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Any other words are sent as one command, e.g. `termtimer add 10m tea`.
    #[command(external_subcommand)]
    Words(Vec<String>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(AppConfig::default_path);
    let config = load_config(config_path.as_deref()).await?;

    // The front-end shares the terminal with the prompt, so it stays quiet
    // unless asked.
    let baseline = match cli.command {
        Some(Commands::Daemon) => config.logging.level.as_str(),
        _ => "warn",
    };
    init_tracing(cli.verbose, baseline);
    if let Some(path) = &config_path {
        debug!(path = %path.display(), "Configuration path");
    }

    match cli.command {
        Some(Commands::Daemon) => cmd_daemon(config).await?,
        Some(Commands::Config { show }) => cmd_config(&config, config_path.as_deref(), show)?,
        Some(Commands::Words(words)) => {
            cmd_frontend(&config, cli.config.as_deref(), Some(words)).await?
        }
        None => cmd_frontend(&config, cli.config.as_deref(), None).await?,
    }

    Ok(())
}

fn init_tracing(verbose: u8, baseline: &str) {
    let filter = match verbose {
        0 => baseline,
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

async fn cmd_daemon(config: AppConfig) -> Result<()> {
    info!("Starting termtimer daemon");
    let daemon = termtimer_core::Daemon::new(config);
    daemon.run().await.map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn cmd_frontend(
    config: &AppConfig,
    explicit_config: Option<&Path>,
    words: Option<Vec<String>>,
) -> Result<()> {
    let client = launcher::ensure_daemon(config, explicit_config).await?;
    let mut shell = shell::Shell::new();

    // Say anything the daemon has been holding before taking input.
    let pending = client.poll().await.context("daemon did not answer")?;
    if shell::take_reply(&pending) == shell::Flow::Exit {
        return Ok(());
    }

    match words {
        Some(words) => {
            shell::run_line(&mut shell, &client, &words.join(" ")).await?;
        }
        None => shell::interactive(&mut shell, &client).await?,
    }
    Ok(())
}

fn cmd_config(config: &AppConfig, path: Option<&Path>, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        match path {
            Some(path) if path.exists() => {
                println!("Configuration at '{}' is valid.", path.display())
            }
            _ => println!("No configuration file, using defaults."),
        }
    }
    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) if path.exists() => AppConfig::load(path)
            .await
            .with_context(|| format!("invalid configuration in {}", path.display())),
        _ => Ok(AppConfig::default()),
    }
}
