//! Core of the I14Y structure editor: a graph of datasets, classes and data
//! elements that is exported as a SHACL data structure in Turtle.
//!
//! This crate has no I/O. It is shared by the `i14y-struct` CLI, the
//! `i14y-structure-wasm` bindings and the HTTP server, which keeps one
//! [`GraphModel`] per editing session.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Data types: [`Node`], [`Edge`], [`LangMap`], [`Cardinality`], [`Datatype`], [`Constraints`] |
//! | [`graph`] | [`GraphModel`]: the mutable graph with its structural invariants |
//! | [`validation`] | Field invariants per node variant and URI slugs |
//! | [`datatype`] | Datatype inference for CSV columns, XSD types and concepts |
//! | [`turtle`] | Deterministic Turtle export in the I14Y SHACL profile |
//! | [`import`] | CSV, XSD and Turtle importers |
//! | [`project`] | Versioned JSON project files |
//! | [`vocab`] | RDF namespaces and prefixes |
//! | [`error`] | The error taxonomy shared by all operations |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use i14y_structure::{turtle, GraphModel, Lang, LangMap, NodeFields, NodeKind};
//!
//! let mut graph = GraphModel::with_dataset(LangMap::single(Lang::De, "Personen"))?;
//! let dataset = graph.dataset().unwrap().id.clone();
//! graph.add_child(
//!     &dataset,
//!     NodeKind::DataElement,
//!     NodeFields::titled(LangMap::single(Lang::De, "Name")),
//!     None,
//! )?;
//!
//! let ttl = turtle::serialize(&graph.snapshot(), &turtle::ExportOptions::default())?;
//! ```

pub mod datatype;
pub mod error;
pub mod graph;
pub mod import;
pub mod project;
pub mod turtle;
pub mod types;
pub mod validation;
pub mod vocab;

pub use error::{Error, ErrorKind, Result};
pub use graph::GraphModel;
pub use import::{ImportWarning, Imported, WarningKind};
pub use types::{
    resolve_label, Cardinality, ConceptFacets, ConceptRef, Constraints, DatasetRef, Datatype, Edge,
    GraphData, Lang, LangMap, LangPatch, Node, NodeFields, NodeKind, NodePatch, Position,
};
pub use validation::{validate_node, ValidationError};
