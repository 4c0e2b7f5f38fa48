// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use clipmgr::{
    config::Settings,
    daemon::shutdown_signal,
    path::default_config_path,
    select::clear_history,
    Context,
};

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "clipmgr [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            Cli::command().print_help()?;
            return Ok(());
        };

        let path = match self.config {
            Some(path) => path,
            None => default_config_path()?,
        };
        let settings = Settings::load(&path)
            .with_context(|| format!("failed to load configuration {:?}", path.display()))?;
        let context = Context::new(settings)?;

        match command {
            Command::Daemon => run_daemon(context).await,
            Command::Select => run_select(context).await,
            Command::Pin => run_pin(context).await,
            Command::Clear => run_clear(context),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Watch clipboard and record history until interrupted.
    Daemon,

    /// Pick a clip from history and place it back onto the clipboard.
    Select,

    /// Pick a clip to pin, or a pinned clip to unpin.
    Pin,

    /// Clear history, keeping pinned clips.
    Clear,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_daemon(context: Context) -> Result<()> {
    let mut daemon = context.daemon()?;
    let shutdown = shutdown_signal().context("failed to listen for shutdown signals")?;
    info!("starting clipboard daemon (press Ctrl-C to stop)");
    daemon.run_until(shutdown).await;

    Ok(())
}

async fn run_select(context: Context) -> Result<()> {
    let selector = context.selector()?;
    selector.select().await?;

    Ok(())
}

async fn run_pin(context: Context) -> Result<()> {
    let selector = context.selector()?;
    selector.pin().await?;

    Ok(())
}

fn run_clear(context: Context) -> Result<()> {
    clear_history(&context.persistence(), context.settings().history);

    Ok(())
}
