//! Turtle serialization of a structure graph into the I14Y SHACL profile.
//!
//! The document consists of prefix declarations followed by one block per
//! resource, in this order:
//!
//! 1. the dataset shape (`cube:DataStructureDefinition`, `rdfs:Class`,
//!    `sh:NodeShape`);
//! 2. a pre-order walk of the containment tree: each data element as a
//!    property shape, each class as a property shape followed by its own node
//!    shape, then the class's children.
//!
//! Output is a pure function of the snapshot and [`ExportOptions`]: the only
//! time-dependent triple is `schema:validFrom` on the dataset, which takes its
//! date from the options.
//!
//! ```text
//! <https://www.i14y.admin.ch/resources/datasets/Personen/structure/Personen/Name>
//!     a cube:AttributeProperty, owl:DatatypeProperty, sh:PropertyShape ;
//!     dcterms:title "Name"@de ;
//!     rdfs:label "Name"@de ;
//!     sh:name "Name"@de ;
//!     sh:path <https://www.i14y.admin.ch/resources/datasets/Personen/structure/Personen/Name> ;
//!     sh:datatype xsd:string ;
//!     sh:order 1 ;
//!     sh:minCount 1 ;
//!     sh:maxCount 1 .
//! ```

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::sibling_order;
use crate::types::{Datatype, Edge, GraphData, LangMap, Node, NodeKind};
use crate::validation::{sanitize_id, slugify};
use crate::vocab;

/// Version emitted for datasets that carry none.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Parameters of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Base of the per-dataset structure namespace.
    pub base: String,
    /// Date of the `schema:validFrom` triple.
    pub valid_from: NaiveDate,
}

impl ExportOptions {
    pub fn new(valid_from: NaiveDate) -> Self {
        Self {
            base: vocab::DATASET_BASE.to_string(),
            valid_from,
        }
    }
}

impl Default for ExportOptions {
    /// Options dated today (UTC).
    fn default() -> Self {
        Self::new(chrono::Utc::now().date_naive())
    }
}

/// Serialize a snapshot as a Turtle document.
///
/// Fails with [`Error::NoDatasetFound`] before producing any output when the
/// snapshot has no dataset node.
pub fn serialize(data: &GraphData, options: &ExportOptions) -> Result<String> {
    let index = Index::new(data);
    let root = index.root().ok_or(Error::NoDatasetFound)?;

    let dataset_slug = node_slug(root);
    let ns = vocab::structure_namespace(&options.base, &dataset_slug);
    let mut planner = Planner {
        index: &index,
        ns: &ns,
        dataset_slug: &dataset_slug,
        visited: HashSet::from([root.id.as_str()]),
        used: HashSet::from([format!("{ns}{dataset_slug}")]),
    };
    let tree = planner.plan_children(root);

    let skipped = data
        .nodes
        .iter()
        .filter(|n| n.kind != NodeKind::Dataset && !planner.visited.contains(n.id.as_str()))
        .count();
    if skipped > 0 {
        warn!(
            "turtle: {skipped} node(s) not reachable from dataset {} were not exported",
            root.id
        );
    }

    let mut out = String::new();
    write_prefixes(&mut out, &ns);
    let writer = Writer { ns: &ns };

    let dataset_uri = format!("{ns}{dataset_slug}");
    writer.dataset_block(root, &dataset_uri, &tree, options).render(&mut out);
    writer.emit(&tree, &mut out);

    debug!(
        "turtle: serialized dataset {} with {} shape(s)",
        root.id,
        planner.visited.len() - 1
    );
    Ok(out)
}

/// The file name of an export: the dataset slug with a `.ttl` extension.
pub fn export_file_name(data: &GraphData) -> Result<String> {
    let index = Index::new(data);
    let root = index.root().ok_or(Error::NoDatasetFound)?;
    Ok(format!("{}.ttl", node_slug(root)))
}

/// The URI segment of a node: its identifier, else its title, else its id.
pub fn node_slug(node: &Node) -> String {
    node.identifier
        .as_deref()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| node.title.resolve().map(slugify).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| sanitize_id(&node.id))
}

// --- planning ----------------------------------------------------------------

struct Index<'a> {
    data: &'a GraphData,
    nodes: HashMap<&'a str, &'a Node>,
}

impl<'a> Index<'a> {
    fn new(data: &'a GraphData) -> Self {
        Self {
            data,
            nodes: data.nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
        }
    }

    fn root(&self) -> Option<&'a Node> {
        self.data.nodes.iter().find(|n| n.kind == NodeKind::Dataset)
    }

    fn children(&self, id: &str) -> Vec<(&'a Edge, &'a Node)> {
        let mut children: Vec<(&Edge, &Node)> = self
            .data
            .edges
            .iter()
            .filter(|e| e.from == id)
            .filter_map(|e| self.nodes.get(e.to.as_str()).map(|n| (e, *n)))
            .collect();
        children.sort_by(|a, b| sibling_order(a.1, b.1));
        children
    }
}

/// A shape scheduled for emission.
struct Planned<'a> {
    node: &'a Node,
    edge: &'a Edge,
    /// 1-based position among the emitted siblings.
    order: usize,
    /// Property shape URI.
    uri: String,
    /// Node shape URI, for classes.
    node_shape: Option<String>,
    children: Vec<Planned<'a>>,
}

struct Planner<'a, 'i> {
    index: &'i Index<'a>,
    ns: &'i str,
    dataset_slug: &'i str,
    visited: HashSet<&'a str>,
    used: HashSet<String>,
}

impl<'a> Planner<'a, '_> {
    fn plan_children(&mut self, parent: &'a Node) -> Vec<Planned<'a>> {
        let mut planned = Vec::new();
        for (edge, child) in self.index.children(&parent.id) {
            if child.kind == NodeKind::Dataset {
                warn!("turtle: ignoring edge {} into dataset {}", edge.id, child.id);
                continue;
            }
            if !self.visited.insert(child.id.as_str()) {
                debug!(
                    "turtle: node {} already emitted under another parent, skipping edge {}",
                    child.id, edge.id
                );
                continue;
            }

            let (uri, node_shape) = self.allocate(child);
            let children = match child.kind {
                NodeKind::Class => self.plan_children(child),
                _ => {
                    if !self.index.children(&child.id).is_empty() {
                        warn!("turtle: children of data element {} are not exported", child.id);
                    }
                    Vec::new()
                }
            };
            planned.push(Planned {
                node: child,
                edge,
                order: planned.len() + 1,
                uri,
                node_shape,
                children,
            });
        }
        planned
    }

    /// Reserve the URIs of a node. A slug already taken anywhere in the
    /// document gets `-2`, `-3`, … appended, in traversal order.
    fn allocate(&mut self, node: &Node) -> (String, Option<String>) {
        let base = node_slug(node);
        let is_class = node.kind == NodeKind::Class;
        let mut n = 1;
        loop {
            let slug = if n == 1 {
                base.clone()
            } else {
                format!("{base}-{n}")
            };
            let uri = format!("{}{}/{}", self.ns, self.dataset_slug, slug);
            let node_shape = is_class.then(|| format!("{}{}Type", self.ns, slug));
            let free = !self.used.contains(&uri)
                && node_shape.as_ref().map_or(true, |s| !self.used.contains(s));
            if free {
                self.used.insert(uri.clone());
                if let Some(s) = &node_shape {
                    self.used.insert(s.clone());
                }
                return (uri, node_shape);
            }
            n += 1;
        }
    }
}

// --- writing -----------------------------------------------------------------

/// One subject with its predicate/object lines.
struct Block {
    subject: String,
    lines: Vec<(&'static str, Vec<String>)>,
}

impl Block {
    fn new(subject: String) -> Self {
        Self {
            subject,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, predicate: &'static str, objects: Vec<String>) {
        if !objects.is_empty() {
            self.lines.push((predicate, objects));
        }
    }

    fn one(&mut self, predicate: &'static str, object: String) {
        self.lines.push((predicate, vec![object]));
    }

    fn lang(&mut self, predicates: &[&'static str], map: &LangMap) {
        for p in predicates {
            self.push(*p, lang_literals(map));
        }
    }

    fn render(&self, out: &mut String) {
        out.push('\n');
        out.push_str(&self.subject);
        out.push('\n');
        let last = self.lines.len().saturating_sub(1);
        for (i, (predicate, objects)) in self.lines.iter().enumerate() {
            let joined = objects.join(", ");
            let objects = if joined.len() > 100 && objects.len() > 1 {
                objects.join(",\n        ")
            } else {
                joined
            };
            out.push_str("    ");
            out.push_str(predicate);
            out.push(' ');
            out.push_str(&objects);
            out.push_str(if i == last { " .\n" } else { " ;\n" });
        }
    }
}

struct Writer<'i> {
    ns: &'i str,
}

impl Writer<'_> {
    fn emit(&self, shapes: &[Planned<'_>], out: &mut String) {
        for shape in shapes {
            match &shape.node_shape {
                Some(node_shape) => {
                    self.class_property_block(shape, node_shape).render(out);
                    self.class_shape_block(shape, node_shape).render(out);
                    self.emit(&shape.children, out);
                }
                None => self.element_block(shape).render(out),
            }
        }
    }

    fn dataset_block(
        &self,
        node: &Node,
        uri: &str,
        children: &[Planned<'_>],
        options: &ExportOptions,
    ) -> Block {
        let mut b = Block::new(self.term(uri));
        b.push(
            "a",
            vec![
                "cube:DataStructureDefinition".into(),
                "rdfs:Class".into(),
                "sh:NodeShape".into(),
            ],
        );
        b.lang(&["dcterms:title", "rdfs:label"], &node.title);
        b.lang(&["dcterms:description", "rdfs:comment"], &node.description);
        if let Some(dataset) = &node.dataset_ref {
            b.one("dcterms:identifier", literal(&dataset.id));
            b.one("dcat:dataset", iri(&dataset.uri));
        }
        let version = literal(node.version.as_deref().unwrap_or(DEFAULT_VERSION));
        b.one("pav:version", version.clone());
        b.one("schema:version", version);
        b.one(
            "schema:validFrom",
            format!("\"{}\"^^xsd:date", options.valid_from.format("%Y-%m-%d")),
        );
        b.push("sh:property", self.property_list(children));
        b
    }

    fn element_block(&self, shape: &Planned<'_>) -> Block {
        let node = shape.node;
        let constraints = node.constraints.clone().unwrap_or_default();
        let datatype = node.datatype();

        let mut b = Block::new(self.term(&shape.uri));
        let mut types = vec!["cube:AttributeProperty".to_string()];
        if !constraints.in_values.is_empty() {
            types.push("cube:CodedProperty".into());
        }
        types.push("owl:DatatypeProperty".into());
        types.push("sh:PropertyShape".into());
        b.push("a", types);
        if let Some(concept) = &node.concept_ref {
            b.one("dcterms:conformsTo", iri(&concept.uri));
        }
        self.labels(&mut b, node);
        b.one("sh:path", self.term(&shape.uri));
        b.one("sh:datatype", format!("xsd:{}", datatype.local_name()));
        b.one("sh:order", shape.order.to_string());
        self.counts(&mut b, shape.edge);

        if let Some(v) = constraints.min_length {
            b.one("sh:minLength", v.to_string());
        }
        if let Some(v) = constraints.max_length {
            b.one("sh:maxLength", v.to_string());
        }
        if let Some(v) = &constraints.pattern {
            b.one("sh:pattern", literal(v));
        }
        if !constraints.in_values.is_empty() {
            let items: Vec<String> = constraints
                .in_values
                .iter()
                .map(|v| typed_literal(v, datatype))
                .collect();
            b.one("sh:in", format!("( {} )", items.join(" ")));
        }
        if let Some(v) = &constraints.node_reference {
            b.one("sh:node", iri(v));
        }
        if let Some(v) = &constraints.range {
            b.one("sh:class", iri(v));
        }
        if let Some(v) = &constraints.min_inclusive {
            b.one("sh:minInclusive", typed_literal(v, datatype));
        }
        if let Some(v) = &constraints.max_inclusive {
            b.one("sh:maxInclusive", typed_literal(v, datatype));
        }
        b
    }

    fn class_property_block(&self, shape: &Planned<'_>, node_shape: &str) -> Block {
        let mut b = Block::new(self.term(&shape.uri));
        b.push(
            "a",
            vec!["owl:ObjectProperty".into(), "sh:PropertyShape".into()],
        );
        self.labels(&mut b, shape.node);
        b.one("sh:path", self.term(&shape.uri));
        b.one("sh:node", self.term(node_shape));
        b.one("sh:order", shape.order.to_string());
        self.counts(&mut b, shape.edge);
        b
    }

    fn class_shape_block(&self, shape: &Planned<'_>, node_shape: &str) -> Block {
        let mut b = Block::new(self.term(node_shape));
        b.push("a", vec!["rdfs:Class".into(), "sh:NodeShape".into()]);
        b.lang(&["rdfs:label"], &shape.node.title);
        b.lang(&["rdfs:comment"], &shape.node.description);
        b.one("sh:closed", "true".into());
        b.push("sh:property", self.property_list(&shape.children));
        b
    }

    fn labels(&self, b: &mut Block, node: &Node) {
        b.lang(&["dcterms:title", "rdfs:label", "sh:name"], &node.title);
        b.lang(
            &["dcterms:description", "rdfs:comment", "sh:description"],
            &node.description,
        );
    }

    fn counts(&self, b: &mut Block, edge: &Edge) {
        b.one("sh:minCount", edge.cardinality.min_count().to_string());
        if let Some(max) = edge.cardinality.max_count() {
            b.one("sh:maxCount", max.to_string());
        }
    }

    fn property_list(&self, shapes: &[Planned<'_>]) -> Vec<String> {
        shapes.iter().map(|s| self.term(&s.uri)).collect()
    }

    /// `i14y:local` when the local part is a plain name, else `<iri>`.
    fn term(&self, uri: &str) -> String {
        match uri.strip_prefix(self.ns) {
            Some(local)
                if local.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                    && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                format!("i14y:{local}")
            }
            _ => format!("<{uri}>"),
        }
    }
}

// --- helpers -----------------------------------------------------------------

fn write_prefixes(out: &mut String, ns: &str) {
    let mut prefixes: Vec<(&str, &str)> = vocab::PREFIXES.to_vec();
    prefixes.push(("i14y", ns));
    prefixes.sort_by_key(|(p, _)| *p);
    for (prefix, iri) in prefixes {
        out.push_str(&format!("@prefix {prefix}: <{iri}> .\n"));
    }
}

fn lang_literals(map: &LangMap) -> Vec<String> {
    map.iter()
        .map(|(lang, text)| format!("{}@{}", literal(text), lang))
        .collect()
}

/// A full IRI term; `prefix:local` values are expanded first.
fn iri(value: &str) -> String {
    let expanded = if value.contains("://") {
        None
    } else {
        vocab::expand(value)
    };
    format!("<{}>", expanded.as_deref().unwrap_or(value))
}

fn typed_literal(value: &str, datatype: Datatype) -> String {
    match datatype {
        Datatype::String => literal(value),
        dt => format!("{}^^xsd:{}", literal(value), dt.local_name()),
    }
}

/// A double-quoted Turtle string literal.
pub fn literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// --- tests -------------------------------------------------------------------
