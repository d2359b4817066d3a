use clap::Parser;
use prep_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Invalidate { pattern } => cli::cache::invalidate(pattern).await,
        Command::Health => cli::cache::health().await,
    }
}
