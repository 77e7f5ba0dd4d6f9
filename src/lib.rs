//! Routing E2E - end-to-end harness for the routing-table CLI commands
//!
//! This library drives the CLI against a live backend, captures resource
//! identifiers from its structured output and cleans up fixture resources.

pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{Suite, SuiteReport};
