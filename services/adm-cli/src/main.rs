//! adm: command-line client for the Adobe Digital Marketing Suite APIs
//!
//! 1. `authorize` exchanges client credentials plus a username/password for
//!    a token and stores it as the default in the profile file
//! 2. `request <method> [parameters]` calls the REST API with that token
//!
//! Command output goes to stdout; logs go to stderr.

mod cli;
mod commands;
mod config;
mod error;
mod output;
mod params;

use std::sync::Arc;

use adm_auth::TokenStore;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::ReqwestExecutor;

use crate::cli::{Cli, normalize_args};
use crate::commands::Commands;
use crate::config::Settings;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let json = std::env::var("ADM_LOG_FORMAT").is_ok_and(|format| format == "json");
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_tracing();

    let settings = Settings::from_cli(&cli)?;
    debug!(
        profile = %settings.profile_path.display(),
        timeout_secs = settings.timeout.as_secs(),
        "settings resolved"
    );

    let executor =
        Arc::new(ReqwestExecutor::new(settings.timeout).context("failed to build HTTP client")?);
    let store = TokenStore::load(settings.profile_path.clone()).await?;

    let mut commands = Commands::new(executor, store);
    let output = commands.run(cli.command).await?;
    println!("{output}");

    Ok(())
}
