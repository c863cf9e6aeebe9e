//! Node and edge mutation types.

use i14y_structure::{
    Cardinality, ConceptRef, Constraints, DatasetRef, Edge, LangMap, Node, NodeFields, NodeKind,
    Position,
};
use serde::{Deserialize, Serialize};

use crate::catalogue::ConceptSummary;

/// Request body for `POST /nodes`.
///
/// `title` and `description` accept either a language map or a plain string,
/// which is taken as German.
///
/// ```json
/// { "type": "data_element", "title": {"de": "Name"}, "parent_id": "…", "cardinality": "0..1" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateNodeRequest {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub title: LangMap,
    #[serde(default)]
    pub description: LangMap,
    /// When set, the new node is attached below this node in the same step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Cardinality of the edge from `parent_id`; defaults to `1..1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_ref: Option<ConceptRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_ref: Option<DatasetRef>,
}

impl CreateNodeRequest {
    /// The node fields, without the placement (`type`, `parent_id`,
    /// `cardinality`).
    pub fn fields(&self) -> NodeFields {
        NodeFields {
            title: self.title.clone(),
            description: self.description.clone(),
            identifier: self.identifier.clone(),
            order: self.order,
            position: self.position,
            concept_ref: self.concept_ref.clone(),
            constraints: self.constraints.clone(),
            version: self.version.clone(),
            dataset_ref: self.dataset_ref.clone(),
        }
    }
}

/// Response body carrying a single node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeResponse {
    pub success: bool,
    pub node: Node,
    /// The edge created together with the node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<Edge>,
}

impl NodeResponse {
    pub fn new(node: Node) -> Self {
        Self {
            success: true,
            node,
            edge: None,
        }
    }

    pub fn with_edge(node: Node, edge: Edge) -> Self {
        Self {
            success: true,
            node,
            edge: Some(edge),
        }
    }
}

/// Request body for `POST /connect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectRequest {
    /// The containing node.
    #[serde(alias = "from")]
    pub source: String,
    /// The contained node.
    #[serde(alias = "to")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
}

/// Request body for `PUT /edges/{id}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardinalityRequest {
    pub cardinality: Cardinality,
}

/// Response body carrying a single edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeResponse {
    pub success: bool,
    pub edge: Edge,
}

impl EdgeResponse {
    pub fn new(edge: Edge) -> Self {
        Self {
            success: true,
            edge,
        }
    }
}

/// Request body for `POST /nodes/{id}/position`. Coordinates are clamped
/// to `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionRequest {
    pub x: f64,
    pub y: f64,
}

/// Request body for `POST /nodes/{id}/concept`: a concept picked from a
/// search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyConceptRequest {
    pub concept: ConceptSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use i14y_structure::Lang;

    #[test]
    fn create_request_accepts_plain_string_title() {
        let req: CreateNodeRequest = serde_json::from_str(
            r#"{"type": "concept", "title": "Name", "parent_id": "p", "cardinality": "0..1"}"#,
        )
        .unwrap();
        assert_eq!(req.kind, NodeKind::DataElement);
        assert_eq!(req.title.get(Lang::De), Some("Name"));
        assert_eq!(req.cardinality, Some(Cardinality::ZeroOrOne));
        assert!(req.fields().description.is_empty());
    }

    #[test]
    fn connect_accepts_from_and_to() {
        let req: ConnectRequest = serde_json::from_str(r#"{"from": "a", "to": "b"}"#).unwrap();
        assert_eq!(req.source, "a");
        assert_eq!(req.target, "b");
        assert_eq!(req.cardinality, None);
    }
}
