//! Cleanup reconciler
//!
//! Lists every resource of a type and deletes those carrying a fixture
//! name, whichever run created them. Deletes are best-effort.

use std::collections::BTreeSet;

use serde_yaml::Value;

use super::executor::{run_command, Executor};
use super::extract::{record_id, OutputShape};
use super::stackit::StackitCli;
use crate::common::{Error, Result};

/// A resource type and the fixture names to remove from it
#[derive(Debug, Clone)]
pub struct CleanupTarget {
    /// CLI resource word, e.g. `routing-table`
    pub resource: String,
    pub names: BTreeSet<String>,
    /// Flags needed to list and delete this resource type
    pub scope: Vec<String>,
}

impl CleanupTarget {
    pub fn new<I, S>(resource: &str, names: I, scope: Vec<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource: resource.to_string(),
            names: names.into_iter().map(Into::into).collect(),
            scope,
        }
    }
}

/// Names deleted (or not) for one resource type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub resource: String,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl CleanupReport {
    /// Every matching resource was deleted
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every listed resource whose name is in the target set
///
/// Listing must succeed; a failed delete is logged and recorded but does
/// not stop the remaining deletes.
pub async fn reconcile(
    executor: &dyn Executor,
    cli: &StackitCli,
    target: &CleanupTarget,
) -> Result<CleanupReport> {
    let resource = target.resource.as_str();
    let listing = cli
        .command([resource, "list"])
        .output("yaml")
        .args(&target.scope)
        .describe(format!("Cleanup list {resource}"));

    let execution = executor
        .execute(&listing)
        .await
        .map_err(|e| Error::step(&listing.description, e))?;
    if !execution.success() {
        return Err(Error::CommandFailed {
            description: listing.description,
            code: execution.code,
            output: execution.failure_output().to_string(),
        });
    }

    let shape = OutputShape::decode(&listing.description, &execution.stdout)?;

    let mut report = CleanupReport {
        resource: resource.to_string(),
        ..Default::default()
    };

    for record in shape.records() {
        let Some(name) = record.get("name").and_then(Value::as_str) else {
            continue;
        };
        if !target.names.contains(name) {
            continue;
        }
        let Some(id) = record_id(record) else {
            tracing::warn!("Cleanup: {resource} {name} has no id, skipping");
            continue;
        };

        let delete = cli
            .command([resource, "delete"])
            .id(&id)
            .args(&target.scope)
            .confirm()
            .describe(format!("Cleanup delete {resource} {name}"));

        let execution = run_command(executor, &delete)
            .await
            .map_err(|e| Error::step(&delete.description, e))?;
        if execution.success() {
            report.deleted.push(name.to_string());
        } else {
            report.failed.push(name.to_string());
        }
    }

    Ok(report)
}
