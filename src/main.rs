#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use sectoolbox::cli::{Cli, dispatch};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dispatch(cli).await
}
