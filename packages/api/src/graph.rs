//! Whole-graph, import and project types.

use i14y_structure::{GraphData, ImportWarning, Lang};
use serde::{Deserialize, Serialize};

/// Body of responses that carry nothing but the outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Response body carrying the full graph after a replacing operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphResponse {
    pub success: bool,
    pub graph: GraphData,
}

/// Form fields accompanying an uploaded import file. Each importer reads
/// the fields that apply to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportParams {
    /// Title of the generated dataset (CSV, XSD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    /// Language of generated or untagged labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Lang>,
    /// WHATWG encoding label of a CSV file. Default `utf-8`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Single-character CSV delimiter; detected when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

/// Response body of the import and project-load endpoints.
///
/// ```json
/// { "success": true, "warnings": [], "graph": { "nodes": [ … ], "edges": [ … ] } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(default)]
    pub warnings: Vec<ImportWarning>,
    pub graph: GraphData,
}

impl ImportResponse {
    pub fn new(graph: GraphData, warnings: Vec<ImportWarning>) -> Self {
        Self {
            success: true,
            warnings,
            graph,
        }
    }
}

/// Request body for `POST /project/new`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProjectRequest {
    /// Dataset title; `New Dataset` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Lang>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of live editing sessions.
    pub sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_params_are_all_optional() {
        let params: ImportParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, ImportParams::default());

        let params: ImportParams =
            serde_json::from_str(r#"{"dataset_name": "P", "lang": "fr", "delimiter": ";"}"#).unwrap();
        assert_eq!(params.lang, Some(Lang::Fr));
        assert_eq!(params.delimiter.as_deref(), Some(";"));
    }
}
