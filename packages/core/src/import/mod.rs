//! Importers that turn external documents into a structure graph.
//!
//! | Module | Input |
//! |--------|-------|
//! | [`csv`] | Tabular data with a header row |
//! | [`xsd`] | XML Schema documents |
//! | [`ttl`] | Turtle documents following the I14Y SHACL profile |
//!
//! Every importer builds a fresh [`GraphModel`] and returns it together with
//! the non-fatal anomalies met on the way. A fatal error leaves nothing
//! behind: the caller's graph is only replaced on success.

pub mod csv;
pub mod ttl;
pub mod xsd;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::graph::GraphModel;

/// The outcome of a successful import.
#[derive(Debug, Clone)]
pub struct Imported {
    pub graph: GraphModel,
    pub warnings: Vec<ImportWarning>,
}

/// Category of a non-fatal import anomaly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A node could not be reconstructed and was skipped with its subtree.
    SchemaMismatch,
    /// A type had no canonical datatype and fell back to `string`.
    UnmappedDatatype,
    /// A CSV row had more or fewer cells than the header.
    RaggedRow,
    /// A CSV header or schema name was blank or unusable as a local name
    /// and was replaced by a positional one.
    UnusableName,
    /// A facet or constraint could not be represented and was dropped.
    UnsupportedConstraint,
    /// A type refers to itself; the recursion was cut.
    RecursiveType,
    /// An edge referenced an unknown node and was dropped.
    DanglingEdge,
}

/// A non-fatal import anomaly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportWarning {
    pub kind: WarningKind,
    /// The element, column, shape or node the warning is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl ImportWarning {
    pub fn new(kind: WarningKind, subject: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.map(str::to_string),
            message: message.into(),
        }
    }

    /// A skipped node, recorded as a schema mismatch.
    pub fn skipped(subject: &str, error: &Error) -> Self {
        Self::new(WarningKind::SchemaMismatch, Some(subject), error.to_string())
    }
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{subject}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
