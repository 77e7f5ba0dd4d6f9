//! CLI command definitions
//!
//! Defines the clap commands for the harness binary.

use clap::Subcommand;

use crate::testing::fixtures::DEFAULT_CLI;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the routing-table scenario, then delete fixture resources
    Run {
        /// CLI binary under test (path, or name looked up on PATH)
        #[arg(long = "cli", value_name = "PATH", default_value = DEFAULT_CLI)]
        program: String,
    },

    /// Only delete leftover fixture resources (recovery after an aborted run)
    Cleanup {
        /// CLI binary under test (path, or name looked up on PATH)
        #[arg(long = "cli", value_name = "PATH", default_value = DEFAULT_CLI)]
        program: String,
    },
}
