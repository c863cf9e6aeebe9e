//! Project files: a versioned JSON snapshot of a session's graph.
//!
//! ```json
//! {
//!   "format_version": 2,
//!   "saved_at": "2024-05-01T12:00:00Z",
//!   "nodes": [ { "id": "…", "type": "dataset", "title": { "de": "Personen" } } ],
//!   "edges": [ { "id": "…", "from": "…", "to": "…", "cardinality": "1..1" } ]
//! }
//! ```
//!
//! Files without `format_version` are read as the version 1 layout: `nodes`
//! and `edges` are objects keyed by id, titles are plain strings, data
//! elements have type `concept` and constraints are flat node fields.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::datatype;
use crate::error::{Error, Result};
use crate::graph::GraphModel;
use crate::import::{ImportWarning, Imported, WarningKind};
use crate::types::{
    concept_uri, Cardinality, ConceptRef, Constraints, DatasetRef, Datatype, Edge, GraphData, Lang,
    LangMap, Node, NodeKind, Position,
};
use crate::validation::validate_node;

/// The version written by [`save`].
pub const FORMAT_VERSION: u32 = 2;

/// The on-disk representation of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectFile {
    #[serde(alias = "formatVersion")]
    pub format_version: u32,
    #[serde(default, alias = "savedAt", skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl ProjectFile {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn into_graph_data(self) -> GraphData {
        GraphData {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

/// Snapshot a graph as a project file.
pub fn save(graph: &GraphModel, saved_at: DateTime<Utc>) -> ProjectFile {
    let GraphData { nodes, edges } = graph.snapshot();
    ProjectFile {
        format_version: FORMAT_VERSION,
        saved_at: Some(saved_at),
        nodes,
        edges,
    }
}

/// Download name of a project saved at `saved_at`.
pub fn file_name(saved_at: DateTime<Utc>) -> String {
    format!("shacl_project_{}.json", saved_at.format("%Y%m%d_%H%M%S"))
}

/// Read a project file of any known version.
///
/// Invalid JSON, a non-object document and duplicate node ids fail with
/// [`Error::Parse`]. Unreadable nodes are skipped, nodes without a title get
/// one, and edges touching unknown nodes are dropped; each is reported as a
/// warning. `lang` is the language of plain-string titles.
pub fn load(bytes: &[u8], lang: Lang) -> Result<Imported> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Parse(format!("project file is not valid JSON: {e}")))?;
    let Value::Object(document) = value else {
        return Err(Error::Parse("project file must be a JSON object".into()));
    };

    let mut loader = Loader {
        lang,
        warnings: Vec::new(),
    };
    let version = document
        .get("format_version")
        .or_else(|| document.get("formatVersion"));
    let data = match version {
        None => loader.legacy(&document)?,
        Some(v) => {
            let version = v
                .as_u64()
                .ok_or_else(|| Error::Parse(format!("format_version {v} is not a number")))?;
            if version > u64::from(FORMAT_VERSION) {
                warn!("project: reading format version {version} as version {FORMAT_VERSION}");
                loader.warnings.push(ImportWarning::new(
                    WarningKind::SchemaMismatch,
                    None,
                    format!("format version {version} is newer than {FORMAT_VERSION}, unknown fields ignored"),
                ));
            }
            loader.current(&document)?
        }
    };

    let positioned = version.is_some();
    let mut graph = GraphModel::from_snapshot(data)?;
    if !positioned {
        graph.auto_layout();
    }
    debug!(
        "project: loaded {} node(s), {} edge(s), {} warning(s)",
        graph.node_count(),
        graph.edge_count(),
        loader.warnings.len()
    );
    Ok(Imported {
        graph,
        warnings: loader.warnings,
    })
}

/// Edge fields as stored; `source`/`target` are accepted for `from`/`to`.
#[derive(Debug, Deserialize)]
struct StoredEdge {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "source")]
    from: String,
    #[serde(alias = "target")]
    to: String,
    #[serde(default)]
    cardinality: Option<String>,
}

/// A version 1 node. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyNode {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    description: Option<String>,
    i14y_id: Option<String>,
    i14y_data: Option<Value>,
    i14y_concept_uri: Option<String>,
    i14y_dataset_uri: Option<String>,
    connections: Vec<String>,
    property_order: Option<i64>,
    datatype: Option<String>,
    min_count: Option<u32>,
    max_count: Option<u32>,
    min_length: Option<u32>,
    max_length: Option<u32>,
    pattern: Option<String>,
    in_values: Vec<String>,
    node_reference: Option<String>,
    range: Option<String>,
}

struct Loader {
    lang: Lang,
    warnings: Vec<ImportWarning>,
}

impl Loader {
    fn current(&mut self, document: &Map<String, Value>) -> Result<GraphData> {
        let mut nodes = Vec::new();
        for (i, value) in entries(document.get("nodes")) {
            let mut value = value.clone();
            if let Value::Object(fields) = &mut value {
                let untitled = fields.get("title").map_or(true, Value::is_null);
                if untitled {
                    fields.insert("title".into(), Value::Object(Map::new()));
                }
            }
            let mut node: Node = match serde_json::from_value(value) {
                Ok(node) => node,
                Err(e) => {
                    self.warn(WarningKind::SchemaMismatch, &i, format!("unreadable node: {e}"));
                    continue;
                }
            };
            if node.title.is_empty() {
                self.repair_title(&mut node);
            }
            node.position = Position::clamped(node.position.x, node.position.y);
            nodes.push(node);
        }
        let nodes = self.validated(nodes)?;

        let mut edges = Vec::new();
        for (i, value) in entries(document.get("edges")) {
            match serde_json::from_value::<StoredEdge>(value.clone()) {
                Ok(stored) => {
                    let cardinality = self.cardinality(&i, stored.cardinality.as_deref());
                    edges.push(Edge {
                        id: stored.id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
                        from: stored.from,
                        to: stored.to,
                        cardinality: cardinality.unwrap_or_default(),
                    });
                }
                Err(e) => self.warn(WarningKind::DanglingEdge, &i, format!("unreadable edge: {e}")),
            }
        }
        Ok(GraphData {
            edges: self.linked(&nodes, edges),
            nodes,
        })
    }

    fn legacy(&mut self, document: &Map<String, Value>) -> Result<GraphData> {
        let mut nodes = Vec::new();
        let mut connections = Vec::new();
        let mut counts = HashMap::new();
        for (key, value) in entries(document.get("nodes")) {
            let legacy: LegacyNode = match serde_json::from_value(value.clone()) {
                Ok(legacy) => legacy,
                Err(e) => {
                    self.warn(WarningKind::SchemaMismatch, &key, format!("unreadable node: {e}"));
                    continue;
                }
            };
            let id = legacy.id.clone().unwrap_or(key);
            let Some(node) = self.legacy_node(&id, &legacy) else {
                continue;
            };
            for target in &legacy.connections {
                connections.push((id.clone(), target.clone()));
            }
            if legacy.min_count.is_some() || legacy.max_count.is_some() {
                counts.insert(
                    id.clone(),
                    Cardinality::from_counts(legacy.min_count, legacy.max_count),
                );
            }
            nodes.push(node);
        }
        let nodes = self.validated(nodes)?;

        let mut edges = Vec::new();
        match document.get("edges") {
            Some(stored) => {
                for (key, value) in entries(Some(stored)) {
                    match serde_json::from_value::<StoredEdge>(value.clone()) {
                        Ok(stored) => {
                            let cardinality = self
                                .cardinality(&key, stored.cardinality.as_deref())
                                .or_else(|| counts.get(&stored.to).copied())
                                .unwrap_or_default();
                            edges.push(Edge {
                                id: stored
                                    .id
                                    .or_else(|| (!key.starts_with('#')).then(|| key.clone()))
                                    .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
                                from: stored.from,
                                to: stored.to,
                                cardinality,
                            });
                        }
                        Err(e) => {
                            self.warn(WarningKind::DanglingEdge, &key, format!("unreadable edge: {e}"))
                        }
                    }
                }
            }
            None => {
                let kinds: HashMap<&str, NodeKind> =
                    nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();
                let mut pairs = HashSet::new();
                for (from, to) in connections {
                    // Edges point from container to property; a dataset is
                    // never a property.
                    let (from, to) = match (kinds.get(from.as_str()), kinds.get(to.as_str())) {
                        (Some(k), Some(NodeKind::Dataset)) if *k != NodeKind::Dataset => (to, from),
                        _ => (from, to),
                    };
                    if pairs.contains(&(to.clone(), from.clone())) || !pairs.insert((from.clone(), to.clone())) {
                        continue;
                    }
                    edges.push(Edge {
                        id: format!("{from}-{to}"),
                        cardinality: counts.get(&to).copied().unwrap_or_default(),
                        from,
                        to,
                    });
                }
            }
        }
        Ok(GraphData {
            edges: self.linked(&nodes, edges),
            nodes,
        })
    }

    fn legacy_node(&mut self, id: &str, legacy: &LegacyNode) -> Option<Node> {
        let kind = match legacy.kind.as_deref().map(str::parse::<NodeKind>) {
            Some(Ok(kind)) => kind,
            Some(Err(e)) => {
                self.warn(WarningKind::SchemaMismatch, id, e);
                return None;
            }
            None => {
                self.warn(WarningKind::SchemaMismatch, id, "node has no type");
                return None;
            }
        };

        let i14y = legacy.i14y_data.as_ref();
        let mut title = i14y.map(|d| lang_object(d.get("title"))).unwrap_or_default();
        if let Some(text) = legacy.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            title.fill_missing(&LangMap::single(self.lang, text));
        }
        let mut description = i14y
            .map(|d| lang_object(d.get("description")))
            .unwrap_or_default();
        if let Some(text) = legacy.description.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            description.fill_missing(&LangMap::single(self.lang, text));
        }

        let mut node = Node {
            id: id.to_string(),
            kind,
            title,
            description,
            identifier: None,
            order: legacy.property_order,
            position: Position::default(),
            concept_ref: None,
            constraints: None,
            version: None,
            dataset_ref: None,
        };
        if node.title.is_empty() {
            self.repair_title(&mut node);
        }
        if kind == NodeKind::DataElement {
            node.concept_ref = legacy
                .i14y_concept_uri
                .clone()
                .or_else(|| legacy.i14y_id.as_deref().map(concept_uri))
                .map(ConceptRef::from_uri);
            node.constraints = Some(self.legacy_constraints(id, legacy)).filter(|c| !c.is_empty());
        }
        if kind == NodeKind::Dataset {
            node.dataset_ref = match (&legacy.i14y_id, &legacy.i14y_dataset_uri) {
                (Some(id), Some(uri)) => Some(DatasetRef {
                    id: id.clone(),
                    uri: uri.clone(),
                }),
                (Some(id), None) => Some(DatasetRef::new(id.as_str())),
                (None, Some(uri)) => DatasetRef::from_uri(uri.as_str()),
                (None, None) => None,
            };
        }
        Some(node)
    }

    fn legacy_constraints(&mut self, id: &str, legacy: &LegacyNode) -> Constraints {
        let datatype = match legacy.datatype.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => match text.parse::<Datatype>() {
                Ok(dt) => Some(dt),
                Err(_) => {
                    let local = text.rsplit(':').next().unwrap_or(text);
                    let mapped = datatype::xsd_builtin(local);
                    if mapped.is_none() {
                        self.warn(
                            WarningKind::UnmappedDatatype,
                            id,
                            format!("datatype {text:?} has no canonical form, using string"),
                        );
                    }
                    mapped
                }
            },
        };
        Constraints {
            datatype: datatype.filter(|dt| *dt != Datatype::String),
            min_length: legacy.min_length,
            max_length: legacy.max_length,
            pattern: legacy.pattern.clone().filter(|p| !p.trim().is_empty()),
            in_values: legacy
                .in_values
                .iter()
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .collect(),
            node_reference: legacy.node_reference.clone().filter(|v| !v.trim().is_empty()),
            range: legacy.range.clone().filter(|v| !v.trim().is_empty()),
            ..Default::default()
        }
    }

    fn repair_title(&mut self, node: &mut Node) {
        let fallback = format!("Untitled {}", node.kind);
        self.warn(
            WarningKind::SchemaMismatch,
            &node.id,
            format!("node has no title, using {fallback:?}"),
        );
        node.title.set(self.lang, fallback);
    }

    /// Reject duplicate ids and drop nodes that violate their variant's
    /// invariants.
    fn validated(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut ids = HashSet::new();
        let mut kept = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !ids.insert(node.id.clone()) {
                return Err(Error::Parse(format!("duplicate node id {}", node.id)));
            }
            match validate_node(&node) {
                Ok(()) => kept.push(node),
                Err(e) => self.warn(WarningKind::SchemaMismatch, &node.id, e.to_string()),
            }
        }
        Ok(kept)
    }

    /// Drop edges with an unknown end or a repeated id.
    fn linked(&mut self, nodes: &[Node], edges: Vec<Edge>) -> Vec<Edge> {
        let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let mut ids = HashSet::new();
        let mut kept = Vec::with_capacity(edges.len());
        for edge in edges {
            if !known.contains(edge.from.as_str()) || !known.contains(edge.to.as_str()) {
                self.warn(
                    WarningKind::DanglingEdge,
                    &edge.id,
                    format!("edge {} -> {} references an unknown node", edge.from, edge.to),
                );
                continue;
            }
            if !ids.insert(edge.id.clone()) {
                self.warn(WarningKind::DanglingEdge, &edge.id, "repeated edge id");
                continue;
            }
            kept.push(edge);
        }
        kept
    }

    fn cardinality(&mut self, subject: &str, text: Option<&str>) -> Option<Cardinality> {
        match text?.parse::<Cardinality>() {
            Ok(c) => Some(c),
            Err(e) => {
                self.warn(WarningKind::SchemaMismatch, subject, e);
                None
            }
        }
    }

    fn warn(&mut self, kind: WarningKind, subject: &str, message: impl Into<String>) {
        self.warnings
            .push(ImportWarning::new(kind, Some(subject), message));
    }
}

/// Entries of an array (keyed by position) or an object (keyed by key).
fn entries(value: Option<&Value>) -> Vec<(String, &Value)> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("#{i}"), v))
            .collect(),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        _ => Vec::new(),
    }
}

/// The supported languages of a `{"de": …, "en": …}` object.
fn lang_object(value: Option<&Value>) -> LangMap {
    let Some(Value::Object(map)) = value else {
        return LangMap::new();
    };
    Lang::ALL
        .into_iter()
        .filter_map(|lang| {
            map.get(lang.as_str())
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| (lang, t.to_string()))
        })
        .collect()
}
