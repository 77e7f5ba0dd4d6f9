//! Invocation builder for the CLI under test
//!
//! Commands have the shape
//! `<resource> <action> [id] [--flag value ...] [-y] [-o format]`.

use std::path::Path;

use super::executor::Invocation;
use super::extract::ResourceId;
use crate::common::{Error, Result};

/// The CLI binary the suite drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackitCli {
    program: String,
}

impl StackitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve the binary: paths must exist, bare names are looked up on PATH
    pub fn locate(program: &str) -> Result<Self> {
        let path = Path::new(program);
        if path.components().count() > 1 {
            if path.is_file() {
                return Ok(Self::new(program));
            }
            return Err(Error::CliNotFound(program.to_string()));
        }

        which::which(program)
            .map(|found| Self::new(found.to_string_lossy()))
            .map_err(|_| Error::CliNotFound(program.to_string()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Start a command line from its leading words, e.g. `["network", "list"]`
    pub fn command<I, S>(&self, words: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![self.program.clone()];
        argv.extend(words.into_iter().map(Into::into));
        CommandLine { argv }
    }
}

/// Argument vector under construction
#[derive(Debug, Clone)]
pub struct CommandLine {
    argv: Vec<String>,
}

impl CommandLine {
    /// Positional resource identifier
    pub fn id(mut self, id: &ResourceId) -> Self {
        self.argv.push(id.to_string());
        self
    }

    /// `--name value`
    pub fn flag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.argv.push(format!("--{name}"));
        self.argv.push(value.into());
        self
    }

    /// Boolean `--name`
    pub fn switch(mut self, name: &str) -> Self {
        self.argv.push(format!("--{name}"));
        self
    }

    /// Raw trailing arguments
    pub fn args(mut self, args: &[String]) -> Self {
        self.argv.extend(args.iter().cloned());
        self
    }

    /// Skip the confirmation prompt
    pub fn confirm(mut self) -> Self {
        self.argv.push("-y".to_string());
        self
    }

    /// `-o <format>`
    pub fn output(mut self, format: &str) -> Self {
        self.argv.push("-o".to_string());
        self.argv.push(format.to_string());
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Invocation {
        Invocation::new(description, self.argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_order() {
        let cli = StackitCli::new("./bin/stackit");
        let id = ResourceId::new("rt-1").unwrap();
        let inv = cli
            .command(["routing-table", "delete"])
            .id(&id)
            .args(&["--organization-id".to_string(), "org".to_string()])
            .confirm()
            .describe("Delete routing-table");

        assert_eq!(inv.program(), "./bin/stackit");
        assert_eq!(
            inv.args(),
            ["routing-table", "delete", "rt-1", "--organization-id", "org", "-y"]
        );
        assert_eq!(inv.description, "Delete routing-table");
    }

    #[test]
    fn test_flags_and_output() {
        let inv = StackitCli::new("stackit")
            .command(["routing-table", "update"])
            .flag("description", "Test desc")
            .switch("non-dynamic-routes")
            .output("pretty")
            .describe("Update");

        assert_eq!(
            inv.args(),
            [
                "routing-table",
                "update",
                "--description",
                "Test desc",
                "--non-dynamic-routes",
                "-o",
                "pretty"
            ]
        );
    }

    #[test]
    fn test_locate_missing_path() {
        let err = StackitCli::locate("./no/such/stackit").unwrap_err();
        assert!(matches!(err, Error::CliNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_on_path() {
        let cli = StackitCli::locate("sh").unwrap();
        assert!(cli.program().ends_with("sh"));
    }
}
