mod auth;
mod billing;
mod cli;
mod config;
mod error;
mod export;
mod output;
mod pipeline;
mod providers;
mod window;
mod worklist;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting runcost - GitHub Actions job history collector");
    cli.execute().await?;

    Ok(())
}
