use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::types::{
    Cardinality, ConceptFacets, ConceptRef, DatasetRef, Edge, GraphData, LangMap, Node,
    NodeFields, NodeKind, NodePatch, Position,
};
use crate::validation::{check_pattern, validate_node};

/// The in-memory structure graph of one editing session.
///
/// Nodes and edges are keyed by UUIDv7 ids, so iteration follows creation
/// order. Ids are never reused, even after deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn not_found_node(id: &str) -> Error {
    Error::NotFound(format!("node {id}"))
}

fn not_found_edge(id: &str) -> Error {
    Error::NotFound(format!("edge {id}"))
}

impl GraphModel {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh graph holding a single dataset node.
    pub fn with_dataset(title: LangMap) -> Result<Self> {
        let mut graph = Self::new();
        graph.add_node(
            NodeKind::Dataset,
            NodeFields {
                position: Some(Position { x: 0.5, y: 0.1 }),
                ..NodeFields::titled(title)
            },
        )?;
        Ok(graph)
    }

    /// Rebuild a graph from a snapshot.
    ///
    /// Checks structure only: ids must be unique and every edge must connect
    /// two known nodes.
    pub fn from_snapshot(data: GraphData) -> Result<Self> {
        let mut graph = Self::new();
        for node in data.nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(Error::InvalidArgument(format!("duplicate node id {}", node.id)));
            }
            graph.nodes.insert(node.id.clone(), node);
        }
        for edge in data.edges {
            if graph.edges.contains_key(&edge.id) {
                return Err(Error::InvalidArgument(format!("duplicate edge id {}", edge.id)));
            }
            for end in [&edge.from, &edge.to] {
                if !graph.nodes.contains_key(end) {
                    return Err(not_found_node(end));
                }
            }
            graph.edges.insert(edge.id.clone(), edge);
        }
        Ok(graph)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root dataset: the oldest dataset node, if any.
    pub fn dataset(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.kind == NodeKind::Dataset)
    }

    /// The edge `from → to`, if present.
    pub fn edge_between(&self, from: &str, to: &str) -> Option<&Edge> {
        self.edges.values().find(|e| e.from == from && e.to == to)
    }

    /// Children of `id` with their incoming edge, in emission order.
    pub fn children(&self, id: &str) -> Vec<(&Edge, &Node)> {
        let mut children: Vec<(&Edge, &Node)> = self
            .edges
            .values()
            .filter(|e| e.from == id)
            .filter_map(|e| self.nodes.get(&e.to).map(|n| (e, n)))
            .collect();
        children.sort_by(|a, b| sibling_order(a.1, b.1));
        children
    }

    /// Direct parents of `id`.
    pub fn parents(&self, id: &str) -> Vec<&Node> {
        self.edges
            .values()
            .filter(|e| e.to == id)
            .filter_map(|e| self.nodes.get(&e.from))
            .collect()
    }

    // --- mutations -----------------------------------------------------------

    /// Create a node, validating the required fields of its variant.
    pub fn add_node(&mut self, kind: NodeKind, fields: NodeFields) -> Result<Node> {
        let node = Node {
            id: new_id(),
            kind,
            title: fields.title,
            description: fields.description,
            identifier: normalize_identifier(fields.identifier),
            order: fields.order,
            position: fields
                .position
                .map(|p| Position::clamped(p.x, p.y))
                .unwrap_or_default(),
            concept_ref: fields.concept_ref,
            constraints: fields.constraints.filter(|c| !c.is_empty()),
            version: fields.version.filter(|v| !v.trim().is_empty()),
            dataset_ref: fields.dataset_ref,
        };
        validate_node(&node)?;
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    /// Create a node and attach it below `parent_id` in one step.
    ///
    /// The parent is checked before anything is created, so a failure leaves
    /// the graph unchanged.
    pub fn add_child(
        &mut self,
        parent_id: &str,
        kind: NodeKind,
        fields: NodeFields,
        cardinality: Option<Cardinality>,
    ) -> Result<(Node, Edge)> {
        if !self.nodes.contains_key(parent_id) {
            return Err(not_found_node(parent_id));
        }
        if kind == NodeKind::Dataset {
            return Err(Error::InvalidArgument(
                "a dataset cannot be placed below another node".into(),
            ));
        }
        let node = self.add_node(kind, fields)?;
        match self.connect(parent_id, &node.id, cardinality) {
            Ok(edge) => Ok((node, edge)),
            Err(e) => {
                self.nodes.remove(&node.id);
                Err(e)
            }
        }
    }

    /// Merge a partial update into a node.
    ///
    /// Multilingual maps merge key-wise. The node is left unchanged when the
    /// result would violate its variant's invariants.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<Node> {
        let current = self.nodes.get(id).ok_or_else(|| not_found_node(id))?;
        let mut node = current.clone();

        if let Some(title) = &patch.title {
            node.title.merge(title);
        }
        if let Some(description) = &patch.description {
            node.description.merge(description);
        }
        if let Some(identifier) = patch.identifier {
            node.identifier = normalize_identifier(identifier);
        }
        if let Some(order) = patch.order {
            node.order = order;
        }
        if let Some(p) = patch.position {
            node.position = Position::clamped(p.x, p.y);
        }
        if let Some(concept_ref) = patch.concept_ref {
            node.concept_ref = concept_ref;
        }
        if let Some(constraints) = patch.constraints {
            node.constraints = constraints.filter(|c| !c.is_empty());
        }
        if let Some(version) = patch.version {
            node.version = version.filter(|v| !v.trim().is_empty());
        }
        if let Some(dataset_ref) = patch.dataset_ref {
            node.dataset_ref = dataset_ref;
        }

        validate_node(&node)?;
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    /// Remove a node and every edge where it is `from` or `to`.
    ///
    /// The sole dataset is protected.
    pub fn delete_node(&mut self, id: &str) -> Result<Node> {
        let node = self.nodes.get(id).ok_or_else(|| not_found_node(id))?;
        if node.kind == NodeKind::Dataset && self.dataset_count() == 1 {
            return Err(Error::Protected(format!(
                "node {id} is the only dataset and cannot be deleted"
            )));
        }
        self.edges.retain(|_, e| e.from != id && e.to != id);
        self.nodes.remove(id).ok_or_else(|| not_found_node(id))
    }

    /// Connect `from → to`. Cardinality defaults to `1..1`.
    pub fn connect(
        &mut self,
        from: &str,
        to: &str,
        cardinality: Option<Cardinality>,
    ) -> Result<Edge> {
        if !self.nodes.contains_key(from) {
            return Err(not_found_node(from));
        }
        let target = self.nodes.get(to).ok_or_else(|| not_found_node(to))?;
        if from == to {
            return Err(Error::InvalidArgument(format!("self-loop on node {from}")));
        }
        if let Some(existing) = self.edge_between(from, to) {
            return Err(Error::Conflict(format!(
                "edge {} already connects {from} to {to}",
                existing.id
            )));
        }
        if target.kind == NodeKind::Dataset {
            return Err(Error::InvalidArgument(format!(
                "dataset {to} cannot be the target of an edge"
            )));
        }
        if self.reaches(to, from) {
            return Err(Error::InvalidArgument(format!(
                "edge {from} -> {to} would create a cycle"
            )));
        }

        let edge = Edge {
            id: new_id(),
            from: from.to_string(),
            to: to.to_string(),
            cardinality: cardinality.unwrap_or_default(),
        };
        self.edges.insert(edge.id.clone(), edge.clone());
        Ok(edge)
    }

    /// Remove an edge.
    pub fn disconnect(&mut self, edge_id: &str) -> Result<Edge> {
        self.edges
            .remove(edge_id)
            .ok_or_else(|| not_found_edge(edge_id))
    }

    /// Change the cardinality of an edge.
    pub fn set_cardinality(&mut self, edge_id: &str, cardinality: Cardinality) -> Result<Edge> {
        let edge = self
            .edges
            .get_mut(edge_id)
            .ok_or_else(|| not_found_edge(edge_id))?;
        edge.cardinality = cardinality;
        Ok(edge.clone())
    }

    /// Turn a class into a dataset in place, dropping its incoming edges.
    pub fn convert_class_to_dataset(&mut self, id: &str) -> Result<Node> {
        let node = self.nodes.get_mut(id).ok_or_else(|| not_found_node(id))?;
        if node.kind != NodeKind::Class {
            return Err(Error::InvalidArgument(format!(
                "node {id} is a {}, only a class can become a dataset",
                node.kind
            )));
        }
        node.kind = NodeKind::Dataset;
        let converted = node.clone();
        self.edges.retain(|_, e| e.to != id);
        Ok(converted)
    }

    /// Store a display position, clamped to `[0, 1]`.
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> Result<Node> {
        let node = self.nodes.get_mut(id).ok_or_else(|| not_found_node(id))?;
        node.position = Position::clamped(x, y);
        Ok(node.clone())
    }

    /// Link a data element to a concept.
    ///
    /// Title and description languages the node lacks are taken from the
    /// concept. The concept's pattern, length bounds and code list replace the
    /// node's own; its datatype is applied only when no datatype is set yet.
    /// A pattern that does not compile or inverted length bounds are ignored.
    pub fn apply_concept(
        &mut self,
        id: &str,
        concept: ConceptRef,
        facets: ConceptFacets,
    ) -> Result<Node> {
        let current = self.nodes.get(id).ok_or_else(|| not_found_node(id))?;
        if current.kind != NodeKind::DataElement {
            return Err(Error::InvalidArgument(format!(
                "node {id} is a {}, concepts apply to data elements only",
                current.kind
            )));
        }
        let mut node = current.clone();
        node.title.fill_missing(&concept.title);
        node.description.fill_missing(&concept.description);

        let mut constraints = node.constraints.take().unwrap_or_default();
        if let Some(dt) = facets.datatype {
            constraints.datatype.get_or_insert(dt);
        }
        if let Some(pattern) = facets.pattern.filter(|p| check_pattern(p).is_ok()) {
            constraints.pattern = Some(pattern);
        }
        match (facets.min_length, facets.max_length) {
            (Some(min), Some(max)) if min > max => {}
            (min, max) => {
                if min.is_some() {
                    constraints.min_length = min;
                }
                if max.is_some() {
                    constraints.max_length = max;
                }
            }
        }
        let codes: Vec<String> = facets
            .in_values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !codes.is_empty() {
            constraints.in_values = codes;
        }
        node.constraints = Some(constraints).filter(|c| !c.is_empty());

        node.concept_ref = Some(concept);
        validate_node(&node)?;
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    /// Link a dataset node to a catalogue dataset.
    ///
    /// The catalogue's title and description overwrite the node's, language
    /// by language.
    pub fn link_dataset(
        &mut self,
        id: &str,
        dataset: DatasetRef,
        title: &LangMap,
        description: &LangMap,
    ) -> Result<Node> {
        let current = self.nodes.get(id).ok_or_else(|| not_found_node(id))?;
        if current.kind != NodeKind::Dataset {
            return Err(Error::InvalidArgument(format!(
                "node {id} is a {}, only a dataset can be linked",
                current.kind
            )));
        }
        let mut node = current.clone();
        for (lang, text) in title.iter() {
            node.title.set(lang, text);
        }
        for (lang, text) in description.iter() {
            node.description.set(lang, text);
        }
        node.dataset_ref = Some(dataset);
        validate_node(&node)?;
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    /// Remove a dataset node's catalogue link. Title and description stay.
    pub fn unlink_dataset(&mut self, id: &str) -> Result<Node> {
        let node = self.nodes.get_mut(id).ok_or_else(|| not_found_node(id))?;
        if node.dataset_ref.take().is_none() {
            return Err(Error::InvalidArgument(format!(
                "node {id} is not linked to a catalogue dataset"
            )));
        }
        Ok(node.clone())
    }

    /// An immutable `{nodes, edges}` view, in creation order.
    pub fn snapshot(&self) -> GraphData {
        GraphData {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Assign tiered display positions: depth below the dataset sets the row,
    /// emission order the column. Nodes outside the tree share the last row.
    pub fn auto_layout(&mut self) {
        let Some(root) = self.dataset().map(|n| n.id.clone()) else {
            return;
        };

        let mut rows: Vec<Vec<String>> = vec![vec![root.clone()]];
        let mut seen: HashSet<String> = HashSet::from([root.clone()]);
        let mut queue = VecDeque::from([(root, 0usize)]);
        while let Some((id, depth)) = queue.pop_front() {
            for (_, child) in self.children(&id) {
                if seen.insert(child.id.clone()) {
                    if rows.len() <= depth + 1 {
                        rows.push(Vec::new());
                    }
                    rows[depth + 1].push(child.id.clone());
                    queue.push_back((child.id.clone(), depth + 1));
                }
            }
        }
        let detached: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        if !detached.is_empty() {
            rows.push(detached);
        }

        let row_count = rows.len();
        for (depth, row) in rows.iter().enumerate() {
            let y = if row_count == 1 {
                0.1
            } else {
                0.1 + 0.8 * depth as f64 / (row_count - 1) as f64
            };
            for (i, id) in row.iter().enumerate() {
                let x = (i as f64 + 1.0) / (row.len() as f64 + 1.0);
                if let Some(node) = self.nodes.get_mut(id) {
                    node.position = Position::clamped(x, y);
                }
            }
        }
    }

    // --- helpers -------------------------------------------------------------

    fn dataset_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.kind == NodeKind::Dataset)
            .count()
    }

    /// Whether `target` is reachable from `start` along edge direction.
    fn reaches(&self, start: &str, target: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.extend(
                self.edges
                    .values()
                    .filter(|e| e.from == id)
                    .map(|e| e.to.as_str()),
            );
        }
        false
    }
}

fn normalize_identifier(identifier: Option<String>) -> Option<String> {
    identifier
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Emission order among siblings: explicit `order` ascending with unordered
/// nodes last, then the resolved label compared case-insensitively, then the
/// label itself, then the id.
pub fn sibling_order(a: &Node, b: &Node) -> Ordering {
    let by_order = match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_order
        .then_with(|| a.label().to_lowercase().cmp(&b.label().to_lowercase()))
        .then_with(|| a.label().cmp(b.label()))
        .then_with(|| a.id.cmp(&b.id))
}

// --- tests -------------------------------------------------------------------
