//! Routing E2E - end-to-end harness for the routing-table CLI commands
//!
//! Runs a scripted create/update/delete scenario for networks, routing
//! tables and routes against a live backend, then removes fixture resources.

use clap::Parser;
use routing_e2e::common::logging;
use routing_e2e::{cli, commands};
use commands::Commands;

#[derive(Parser)]
#[command(name = "routing-e2e", about = "End-to-end harness for routing-table commands")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
