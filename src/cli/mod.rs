//! CLI module for Prep Cache
//!
//! Provides subcommands:
//! - `serve`: HTTP server with health, metrics and admin endpoints
//! - `invalidate`: one-shot pattern invalidation against the configured backends
//! - `health`: one-shot backend health report

pub mod cache;
pub mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Prep Cache - cache layer for the interview-prep content API
#[derive(Parser)]
#[command(name = "prep-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Delete every cached key matching a glob (`*` matches any sequence)
    Invalidate {
        /// Pattern such as `questions*` or an exact key
        pattern: String,
    },

    /// Print the health of every cache backend
    Health,
}

/// Loads `.env`, the configuration files and the environment, then starts logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    Ok(config)
}
