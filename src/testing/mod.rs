//! E2E Test Runner
//!
//! Drives the routing CLI as a subprocess through a fixed scenario,
//! threading identifiers captured from structured output into later
//! steps and removing fixture resources at the end.

pub mod cleanup;
pub mod executor;
pub mod extract;
pub mod fixtures;
pub mod report;
pub mod stackit;
pub mod suite;

#[cfg(test)]
pub(crate) mod fake;

pub use cleanup::{reconcile, CleanupReport, CleanupTarget};
pub use executor::{run_command, Execution, Executor, Invocation, ProcessExecutor};
pub use extract::{extract_id, OutputShape, ResourceId, Selector};
pub use report::{Expectation, StepRecord, SuiteReport};
pub use stackit::{CommandLine, StackitCli};
pub use suite::{run_cleanup, Suite, SuiteState};
