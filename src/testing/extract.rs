//! Identifier extraction from structured CLI output
//!
//! Create commands are re-run with `-o yaml` and the decoded document is
//! classified once into an [`OutputShape`]. A [`Selector`] then picks the
//! identifier out of it. Extraction failures are fatal for the run since
//! later steps consume the identifier.

use std::fmt;

use serde_yaml::{Mapping, Value};

use super::executor::{Executor, Invocation};
use crate::common::{Error, Result};

/// Opaque, non-empty identifier assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    /// Returns `None` for an empty string
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.is_empty()).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path-like selector naming where the identifier lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `.items...`: first record of the `items` list
    Items,
    /// `.field`: a field of the top-level mapping
    Field(String),
    /// `field`: a literal key of the top-level mapping
    Key(String),
}

impl Selector {
    pub fn parse(path: &str) -> Self {
        if path.starts_with(".items") {
            Self::Items
        } else if path.starts_with('.') {
            Self::Field(path.trim_start_matches('.').to_string())
        } else {
            Self::Key(path.to_string())
        }
    }
}

/// The shapes `-o yaml` output comes in
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// A bare list of records
    List(Vec<Value>),
    /// A mapping carrying its records in an `items` list
    ItemsWrapped { items: Vec<Value>, mapping: Mapping },
    /// A single record
    Mapping(Mapping),
    /// Scalars and empty documents
    Other,
}

impl From<Value> for OutputShape {
    fn from(value: Value) -> Self {
        match value {
            Value::Sequence(items) => Self::List(items),
            Value::Mapping(mapping) => {
                match mapping.get("items").and_then(Value::as_sequence).cloned() {
                    Some(items) => Self::ItemsWrapped { items, mapping },
                    None => Self::Mapping(mapping),
                }
            }
            Value::Tagged(tagged) => Self::from(tagged.value),
            _ => Self::Other,
        }
    }
}

impl OutputShape {
    /// Decode captured stdout
    pub fn decode(description: &str, text: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| Error::decode(description, e))?;
        Ok(Self::from(value))
    }

    /// Resolve an identifier; `None` covers empty lists, absent fields and
    /// falsy values alike
    pub fn resolve(&self, selector: &Selector) -> Option<ResourceId> {
        match self {
            Self::List(items) => items.first().and_then(record_id),
            Self::ItemsWrapped { items, mapping } => match selector {
                Selector::Items => items.first().and_then(record_id),
                Selector::Field(name) | Selector::Key(name) => {
                    mapping.get(name.as_str()).and_then(identifier)
                }
            },
            // An `.items` selector on a mapping without an items list finds nothing
            Self::Mapping(mapping) => match selector {
                Selector::Items => None,
                Selector::Field(name) | Selector::Key(name) => {
                    mapping.get(name.as_str()).and_then(identifier)
                }
            },
            Self::Other => None,
        }
    }

    /// Records of a list response: the list itself or the items list
    pub fn records(&self) -> Vec<&Value> {
        match self {
            Self::List(items) | Self::ItemsWrapped { items, .. } => items.iter().collect(),
            Self::Mapping(_) | Self::Other => Vec::new(),
        }
    }
}

/// Read the `id` field of a record
pub fn record_id(record: &Value) -> Option<ResourceId> {
    record.get("id").and_then(identifier)
}

/// Convert a truthy scalar into an identifier
fn identifier(value: &Value) -> Option<ResourceId> {
    match value {
        Value::String(s) => ResourceId::new(s.as_str()),
        Value::Number(n) if n.as_f64() != Some(0.0) => ResourceId::new(n.to_string()),
        Value::Tagged(tagged) => identifier(&tagged.value),
        _ => None,
    }
}

/// Run a create-style command with `-o yaml` and pull an identifier out of
/// its output
///
/// Any failure (spawn error, non-zero exit, undecodable output, no
/// identifier) becomes [`Error::Extraction`] naming the step.
pub async fn extract_id(
    executor: &dyn Executor,
    invocation: &Invocation,
    selector: &Selector,
) -> Result<ResourceId> {
    let description = invocation.description.as_str();
    let invocation = invocation.with_args(["-o", "yaml"]);

    tracing::info!("{description}");

    let execution = executor
        .execute(&invocation)
        .await
        .map_err(|e| Error::extraction(description, e))?;

    if !execution.success() {
        let failed = Error::CommandFailed {
            description: description.to_string(),
            code: execution.code,
            output: execution.failure_output().to_string(),
        };
        return Err(Error::extraction(description, failed));
    }

    let shape = OutputShape::decode(description, &execution.stdout)
        .map_err(|e| Error::extraction(description, e))?;

    let id = shape
        .resolve(selector)
        .ok_or_else(|| Error::extraction(description, "ID not found"))?;

    tracing::info!("{description} ID: {id}");
    Ok(id)
}
