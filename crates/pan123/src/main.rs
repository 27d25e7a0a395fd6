use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::app::{App, Commands};

mod cli;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let app = App::parse();
    let config = app.conn.client_config();
    match app.cmd {
        Commands::Upload(arg) => cli::upload::upload(config, arg).await,
        Commands::Poll(arg) => cli::poll::poll(config, arg).await,
        Commands::Login => cli::login::login(config).await,
    }
}
