mod api;
mod cli;
mod config;
mod error;
mod format;
mod logging;
mod model;
mod notify;
mod orchestrator;
mod session;
mod storage;
#[cfg(test)]
mod test_support;
mod text_summary;
mod thumbnail;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args).await
}
