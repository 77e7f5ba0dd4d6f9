//! Error types for the routing e2e harness
//!
//! Soft failures (a command exiting non-zero) are not errors here: they are
//! recorded as step outcomes. Everything in this enum aborts the run.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Process Errors ===
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{description} could not run: {source}")]
    Step {
        description: String,
        #[source]
        source: Box<Error>,
    },

    #[error("CLI binary '{0}' not found. Build it first or pass --cli <PATH>")]
    CliNotFound(String),

    // === Output Errors ===
    #[error("Command '{description}' failed with exit code {code}: {output}")]
    CommandFailed {
        description: String,
        code: i32,
        output: String,
    },

    #[error("Failed to decode structured output of '{description}': {source}")]
    Decode {
        description: String,
        #[source]
        source: serde_yaml::Error,
    },

    // === Identifier Errors ===
    #[error("{description} Failed to extract ID: {reason}")]
    Extraction { description: String, reason: String },

    #[error("No {0} ID captured yet")]
    MissingIdentifier(&'static str),
}

impl Error {
    /// Create an extraction error for a step description
    pub fn extraction(description: &str, reason: impl ToString) -> Self {
        Self::Extraction {
            description: description.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Attach the step description to an error raised while running it
    pub fn step(description: &str, source: Error) -> Self {
        Self::Step {
            description: description.to_string(),
            source: Box::new(source),
        }
    }

    /// Create a decode error for a step description
    pub fn decode(description: &str, source: serde_yaml::Error) -> Self {
        Self::Decode {
            description: description.to_string(),
            source,
        }
    }
}
