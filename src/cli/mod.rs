//! CLI command handling
//!
//! Dispatches harness commands and prints the run summary.

use colored::Colorize;

use crate::commands::Commands;
use crate::common::Result;
use crate::testing::report::print_cleanup;
use crate::testing::{run_cleanup, ProcessExecutor, StackitCli, Suite};

/// Dispatch a CLI command
///
/// Returns whether every step behaved as expected and cleanup left no
/// fixture resource behind.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run { program } => {
            let cli = StackitCli::locate(&program)?;
            tracing::debug!(program = cli.program(), "using CLI");

            let report = Suite::new(&ProcessExecutor, &cli).run().await?;
            report.print_summary();

            if report.passed() {
                tracing::info!("All tests finished successfully.");
            }
            Ok(report.passed())
        }

        Commands::Cleanup { program } => {
            let cli = StackitCli::locate(&program)?;
            let (reports, error) = run_cleanup(&ProcessExecutor, &cli).await;

            println!("\n{}", "Cleanup:".cyan());
            for report in &reports {
                print_cleanup(report);
            }
            match error {
                Some(e) => Err(e),
                None => Ok(reports.iter().all(|r| r.is_clean())),
            }
        }
    }
}
