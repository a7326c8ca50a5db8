use anyhow::Context;
use clap::Parser;
use porthole_core::console::{app, cli::Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    app::run(cli).await.context("porthole exited with an error")
}
