//! I14Y catalogue search and link types.

use i14y_structure::types::{concept_uri, dataset_uri};
use i14y_structure::{datatype, ConceptFacets, ConceptRef, DatasetRef, Datatype, LangMap, Node};
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /concepts/search` and `GET /datasets/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text search term.
    #[serde(default)]
    pub q: String,
    /// 1-based result page. Default 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Results per page (1 to 100, default 20).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl SearchQuery {
    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size.map(|s| s.clamp(1, 100)).unwrap_or(20)
    }
}

/// One concept of the I14Y catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConceptSummary {
    pub id: String,
    /// Catalogue URI, derived from `id` when absent.
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: LangMap,
    #[serde(default)]
    pub description: LangMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
    /// Catalogue value type (`String`, `Numeric`, `Date`, `CodeList`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl ConceptSummary {
    /// The reference stored on a data element that conforms to this concept.
    pub fn to_concept_ref(&self) -> ConceptRef {
        let uri = if self.uri.trim().is_empty() {
            concept_uri(&self.id)
        } else {
            self.uri.clone()
        };
        ConceptRef {
            id: Some(self.id.clone()),
            uri,
            title: self.title.clone(),
            description: self.description.clone(),
            publisher: self.publisher_name.clone(),
        }
    }

    /// Datatype suggested by the concept's value type.
    pub fn datatype_hint(&self) -> Option<Datatype> {
        self.value_type
            .as_deref()
            .map(datatype::from_concept_value_type)
    }

    /// Whether the concept's values come from a code list.
    pub fn has_code_list(&self) -> bool {
        self.value_type
            .as_deref()
            .is_some_and(|t| t.to_ascii_lowercase().contains("code"))
    }

    /// The facets a conforming data element takes over, with the code list
    /// fetched separately.
    pub fn facets(&self, in_values: Vec<String>) -> ConceptFacets {
        ConceptFacets {
            datatype: self.datatype_hint(),
            pattern: self.pattern.clone().filter(|p| !p.trim().is_empty()),
            min_length: self.min_length,
            max_length: self.max_length,
            in_values,
        }
    }
}

/// Response body for `GET /concepts/search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConceptSearchResponse {
    pub success: bool,
    pub concepts: Vec<ConceptSummary>,
}

impl ConceptSearchResponse {
    pub fn new(concepts: Vec<ConceptSummary>) -> Self {
        Self {
            success: true,
            concepts,
        }
    }
}

/// One dataset of the I14Y catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetSummary {
    pub id: String,
    /// Catalogue URI, derived from `id` when absent.
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: LangMap,
    #[serde(default)]
    pub description: LangMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
}

impl DatasetSummary {
    /// The link stored on the dataset node.
    pub fn to_dataset_ref(&self) -> DatasetRef {
        let uri = if self.uri.trim().is_empty() {
            dataset_uri(&self.id)
        } else {
            self.uri.clone()
        };
        DatasetRef {
            id: self.id.clone(),
            uri,
        }
    }
}

/// Response body for `GET /datasets/search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetSearchResponse {
    pub success: bool,
    pub datasets: Vec<DatasetSummary>,
}

impl DatasetSearchResponse {
    pub fn new(datasets: Vec<DatasetSummary>) -> Self {
        Self {
            success: true,
            datasets,
        }
    }
}

/// Request body for `POST /dataset/link`: a dataset picked from a search
/// result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkDatasetRequest {
    pub dataset: DatasetSummary,
}

/// Response body of `POST /dataset/link` and `POST /dataset/unlink`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetLinkResponse {
    pub success: bool,
    pub node: Node,
}

impl DatasetLinkResponse {
    pub fn new(node: Node) -> Self {
        Self {
            success: true,
            node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_ref_derives_uri_from_id() {
        let summary = ConceptSummary {
            id: "08d94604".into(),
            publisher_name: Some("BFS".into()),
            value_type: Some("Numeric".into()),
            ..Default::default()
        };
        let r = summary.to_concept_ref();
        assert_eq!(
            r.uri,
            "https://www.i14y.admin.ch/catalog/concepts/08d94604/description"
        );
        assert_eq!(r.publisher.as_deref(), Some("BFS"));
        assert_eq!(summary.datatype_hint(), Some(Datatype::Decimal));
        assert!(!summary.has_code_list());
    }

    #[test]
    fn facets_carry_pattern_and_lengths() {
        let summary = ConceptSummary {
            id: "c".into(),
            value_type: Some("CodeList".into()),
            pattern: Some(" ".into()),
            min_length: Some(2),
            max_length: Some(2),
            ..Default::default()
        };
        assert!(summary.has_code_list());
        let facets = summary.facets(vec!["ZH".into()]);
        assert_eq!(facets.pattern, None);
        assert_eq!((facets.min_length, facets.max_length), (Some(2), Some(2)));
        assert_eq!(facets.in_values, ["ZH"]);
    }

    #[test]
    fn dataset_ref_derives_uri_from_id() {
        let summary = DatasetSummary {
            id: "ds-1".into(),
            ..Default::default()
        };
        assert_eq!(
            summary.to_dataset_ref().uri,
            "https://www.i14y.admin.ch/catalog/datasets/ds-1/description"
        );
    }

    #[test]
    fn page_size_is_clamped() {
        let q = SearchQuery {
            q: "x".into(),
            page: Some(0),
            page_size: Some(1000),
        };
        assert_eq!(q.effective_page(), 1);
        assert_eq!(q.effective_page_size(), 100);
    }
}
