//! Worker process: on-demand runs of the forecasting engines and the
//! scheduled daily job.

mod cli;
mod commands;
mod store;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    charops_observability::init();

    let cli = Cli::parse();
    commands::run(cli).await
}
