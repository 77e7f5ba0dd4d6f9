//! Common utilities shared by the harness and its binaries

pub mod error;
pub mod logging;

pub use error::{Error, Result};
