//! Lookups against the I14Y catalogue: concept and dataset search and
//! concept code lists.
//!
//! These are the only outbound network calls the server makes. They sit
//! behind the [`CatalogueLookup`] trait so handlers and tests can swap the
//! HTTP client for a fixed list.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use i14y_structure::{Error, Lang, LangMap};
use i14y_structure_api::{ConceptSummary, DatasetSummary, SearchQuery};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

/// Failure of an upstream catalogue request.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("I14Y catalogue did not answer within {0:?}")]
    Timeout(Duration),
    #[error("I14Y catalogue request failed: {0}")]
    Transport(String),
    #[error("I14Y catalogue answered with HTTP {0}")]
    Status(u16),
    #[error("I14Y catalogue response has an unexpected shape: {0}")]
    Decode(String),
}

impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        Error::UpstreamUnavailable(e.to_string())
    }
}

/// Source of catalogue entries a structure can be linked to.
#[async_trait]
pub trait CatalogueLookup: Send + Sync {
    /// One page of concepts matching `query`.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ConceptSummary>, LookupError>;

    /// The codes of a concept's code list; empty when it has none.
    async fn codelist(&self, concept_id: &str) -> Result<Vec<String>, LookupError>;

    /// One page of datasets matching `query`.
    async fn search_datasets(&self, query: &SearchQuery)
        -> Result<Vec<DatasetSummary>, LookupError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// [`CatalogueLookup`] backed by the catalogue's `/search` endpoint and the
/// public API's code list export.
///
/// The search endpoint returns every match at once, so paging is applied
/// locally.
pub struct I14yCatalogueClient {
    client: reqwest::Client,
    base_url: String,
    public_api: String,
    timeout: Duration,
}

impl I14yCatalogueClient {
    pub fn new(
        base_url: impl Into<String>,
        public_api: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            public_api: public_api.into(),
            timeout,
        })
    }

    fn transport(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout(self.timeout)
        } else {
            LookupError::Transport(e.to_string())
        }
    }

    /// `GET {base}/search?types={types}&query={q}` as JSON.
    async fn search_raw(&self, types: &str, q: &str) -> Result<Value, LookupError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let mut params = vec![("types", types)];
        if !q.is_empty() {
            params.push(("query", q));
        }
        debug!("catalogue: GET {url} types={types} query={q:?}");

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        if !resp.status().is_success() {
            return Err(LookupError::Status(resp.status().as_u16()));
        }
        resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout(self.timeout)
            } else {
                LookupError::Decode(e.to_string())
            }
        })
    }
}

#[async_trait]
impl CatalogueLookup for I14yCatalogueClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ConceptSummary>, LookupError> {
        let body = self.search_raw("Concept", query.q.trim()).await?;
        let concepts = parse_search_results(&body)?;
        Ok(paginate(concepts, query))
    }

    async fn codelist(&self, concept_id: &str) -> Result<Vec<String>, LookupError> {
        let mut url = Url::parse(&self.public_api)
            .map_err(|e| LookupError::Transport(format!("{}: {e}", self.public_api)))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Transport(format!("{} cannot be a base", self.public_api)))?
            .pop_if_empty()
            .extend(["concepts", concept_id, "codelist-entries", "exports", "json"]);
        debug!("catalogue: GET {url}");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("catalogue: concept {concept_id} has no code list");
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(LookupError::Status(resp.status().as_u16()));
        }
        let body: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout(self.timeout)
            } else {
                LookupError::Decode(e.to_string())
            }
        })?;
        Ok(parse_codelist(&body))
    }

    async fn search_datasets(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<DatasetSummary>, LookupError> {
        let q = query.q.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.search_raw("Dataset", q).await?;
        let datasets = parse_dataset_results(&body)?;
        Ok(paginate(datasets, query))
    }
}

/// Convert the catalogue's concept search payload, a JSON array of entries.
/// Entries without an id are skipped.
pub fn parse_search_results(body: &Value) -> Result<Vec<ConceptSummary>, LookupError> {
    entries_with_id(body)?
        .map(|(id, item)| {
            Ok(ConceptSummary {
                id: id.to_string(),
                uri: String::new(),
                title: lang_map(item.get("title").or_else(|| item.get("name"))),
                description: lang_map(item.get("description")),
                publisher_name: publisher(item),
                value_type: item
                    .get("conceptValueType")
                    .or_else(|| item.get("valueType"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                pattern: item
                    .get("pattern")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
                min_length: length(item.get("minLength")),
                max_length: length(item.get("maxLength")),
            })
        })
        .collect()
}

/// Convert the catalogue's dataset search payload.
pub fn parse_dataset_results(body: &Value) -> Result<Vec<DatasetSummary>, LookupError> {
    entries_with_id(body)?
        .map(|(id, item)| {
            Ok(DatasetSummary {
                id: id.to_string(),
                uri: String::new(),
                title: lang_map(item.get("title").or_else(|| item.get("name"))),
                description: lang_map(item.get("description")),
                publisher_name: publisher(item),
            })
        })
        .collect()
}

fn entries_with_id(body: &Value) -> Result<impl Iterator<Item = (&str, &Value)>, LookupError> {
    let Value::Array(items) = body else {
        return Err(LookupError::Decode(format!(
            "expected an array, got {}",
            json_type(body)
        )));
    };
    Ok(items.iter().filter_map(|item| {
        let id = item.get("id").and_then(Value::as_str).filter(|s| !s.is_empty());
        if id.is_none() {
            warn!("catalogue: skipping search result without id");
        }
        id.map(|id| (id, item))
    }))
}

/// Codes of a code list export.
///
/// The export is an array of entries or an object wrapping one under
/// `entries`, `items`, `data` or `codelistEntries`. An entry's code is its
/// first scalar `code`, `value`, `identifier`, `id`, `key`, `Code` or
/// `Value`, else its resolved `name`, `title` or `label`. Duplicates are
/// dropped.
pub fn parse_codelist(body: &Value) -> Vec<String> {
    const WRAPPERS: [&str; 4] = ["entries", "items", "data", "codelistEntries"];
    const CODE_KEYS: [&str; 7] = ["code", "value", "identifier", "id", "key", "Code", "Value"];
    const LABEL_KEYS: [&str; 3] = ["name", "title", "label"];

    let entries: Vec<&Value> = match body {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match WRAPPERS.iter().find_map(|k| map.get(*k)) {
            Some(Value::Array(items)) => items.iter().collect(),
            _ if CODE_KEYS[..3].iter().any(|k| map.contains_key(*k)) => vec![body],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut codes = Vec::new();
    for entry in entries {
        let code = match entry {
            Value::Object(map) => CODE_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(scalar))
                .or_else(|| {
                    LABEL_KEYS.iter().find_map(|k| match map.get(*k) {
                        Some(v @ Value::Object(_)) => {
                            lang_map(Some(v)).resolve().map(str::to_string)
                        }
                        Some(v) => scalar(v),
                        None => None,
                    })
                }),
            other => scalar(other),
        };
        match code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
            Some(code) if seen.insert(code.clone()) => codes.push(code),
            Some(_) => {}
            None => warn!("catalogue: skipping code list entry without a code"),
        }
    }
    codes
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn length(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The requested page of `items`.
pub fn paginate<T>(items: Vec<T>, query: &SearchQuery) -> Vec<T> {
    let size = query.effective_page_size() as usize;
    let start = (query.effective_page() as usize - 1).saturating_mul(size);
    items.into_iter().skip(start).take(size).collect()
}

/// A language object (`{"de": …, "fr": …}`) or plain string. Languages
/// outside de/en/fr/it, such as `rm`, are dropped.
fn lang_map(value: Option<&Value>) -> LangMap {
    match value {
        Some(Value::String(s)) => LangMap::single(Lang::De, s.as_str()),
        Some(Value::Object(map)) => Lang::ALL
            .into_iter()
            .filter_map(|lang| {
                map.get(lang.as_str())
                    .and_then(Value::as_str)
                    .map(|t| (lang, t.to_string()))
            })
            .collect(),
        _ => LangMap::new(),
    }
}

/// `publisherName` is either a string or a language object.
fn publisher(item: &Value) -> Option<String> {
    let value = item
        .get("publisherName")
        .or_else(|| item.get("publisher").and_then(|p| p.get("name")))?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => lang_map(Some(value)).resolve().map(str::to_string),
        _ => None,
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Fixed lists
// ---------------------------------------------------------------------------

/// [`CatalogueLookup`] over in-memory lists, matching the query against
/// titles case-insensitively. Used in tests and offline deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogue {
    concepts: Vec<ConceptSummary>,
    codelists: HashMap<String, Vec<String>>,
    datasets: Vec<DatasetSummary>,
}

impl StaticCatalogue {
    pub fn new(concepts: Vec<ConceptSummary>) -> Self {
        Self {
            concepts,
            ..Default::default()
        }
    }

    pub fn with_codelist(mut self, concept_id: &str, codes: &[&str]) -> Self {
        self.codelists.insert(
            concept_id.to_string(),
            codes.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn with_datasets(mut self, datasets: Vec<DatasetSummary>) -> Self {
        self.datasets = datasets;
        self
    }
}

fn title_matches(title: &LangMap, needle: &str) -> bool {
    needle.is_empty() || title.iter().any(|(_, t)| t.to_lowercase().contains(needle))
}

#[async_trait]
impl CatalogueLookup for StaticCatalogue {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ConceptSummary>, LookupError> {
        let needle = query.q.trim().to_lowercase();
        let matches = self
            .concepts
            .iter()
            .filter(|c| title_matches(&c.title, &needle))
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }

    async fn codelist(&self, concept_id: &str) -> Result<Vec<String>, LookupError> {
        Ok(self.codelists.get(concept_id).cloned().unwrap_or_default())
    }

    async fn search_datasets(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<DatasetSummary>, LookupError> {
        let needle = query.q.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let matches = self
            .datasets
            .iter()
            .filter(|d| title_matches(&d.title, &needle))
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }
}

/// [`CatalogueLookup`] that always fails; used when no catalogue is reachable.
#[derive(Debug, Clone, Default)]
pub struct UnavailableCatalogue;

impl UnavailableCatalogue {
    fn error() -> LookupError {
        LookupError::Transport("no I14Y catalogue configured".into())
    }
}

#[async_trait]
impl CatalogueLookup for UnavailableCatalogue {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<ConceptSummary>, LookupError> {
        Err(Self::error())
    }

    async fn codelist(&self, _concept_id: &str) -> Result<Vec<String>, LookupError> {
        Err(Self::error())
    }

    async fn search_datasets(
        &self,
        _query: &SearchQuery,
    ) -> Result<Vec<DatasetSummary>, LookupError> {
        Err(Self::error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i14y_structure::ErrorKind;
    use serde_json::json;

    fn summary(id: &str, title: &str) -> ConceptSummary {
        ConceptSummary {
            id: id.into(),
            title: LangMap::single(Lang::De, title),
            ..Default::default()
        }
    }

    #[test]
    fn parses_catalogue_entries() {
        let body = json!([
            {
                "id": "08d9",
                "title": {"de": "Geschlecht", "fr": "Sexe", "rm": "Schlattaina"},
                "description": {"de": "Das Geschlecht"},
                "publisherName": {"de": "BFS"},
                "conceptValueType": "CodeList"
            },
            {"title": {"de": "ohne id"}},
            {
                "id": "x", "title": "Plain", "publisherName": "Kanton",
                "pattern": "^[0-9]{4}$", "minLength": 4, "maxLength": "4"
            }
        ]);
        let concepts = parse_search_results(&body).unwrap();
        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts[0].title.get(Lang::Fr), Some("Sexe"));
        assert_eq!(concepts[0].title.len(), 2);
        assert_eq!(concepts[0].publisher_name.as_deref(), Some("BFS"));
        assert_eq!(concepts[0].value_type.as_deref(), Some("CodeList"));
        assert_eq!(concepts[0].pattern, None);
        assert_eq!(concepts[1].title.get(Lang::De), Some("Plain"));
        assert_eq!(concepts[1].publisher_name.as_deref(), Some("Kanton"));
        assert_eq!(concepts[1].pattern.as_deref(), Some("^[0-9]{4}$"));
        assert_eq!((concepts[1].min_length, concepts[1].max_length), (Some(4), Some(4)));
    }

    #[test]
    fn parses_dataset_entries() {
        let body = json!([
            {"id": "ds-1", "title": {"de": "Gebäude", "en": "Buildings"}, "publisher": {"name": "BFS"}},
            {"title": "no id"}
        ]);
        let datasets = parse_dataset_results(&body).unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].title.get(Lang::En), Some("Buildings"));
        assert_eq!(datasets[0].publisher_name.as_deref(), Some("BFS"));
    }

    #[test]
    fn non_array_is_decode_error() {
        let err = parse_search_results(&json!({"data": []})).unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
        assert_eq!(Error::from(err).kind(), ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn codelist_entries_in_their_usual_shapes() {
        let plain = json!([{"code": "1", "name": {"de": "Mann"}}, {"code": 2}, {"Value": "3"}]);
        assert_eq!(parse_codelist(&plain), ["1", "2", "3"]);

        let wrapped = json!({"entries": [
            {"name": {"fr": "Berne"}},
            {"identifier": "ZH"},
            {"identifier": "ZH"},
            {"description": "no code"}
        ]});
        assert_eq!(parse_codelist(&wrapped), ["Berne", "ZH"]);

        assert_eq!(parse_codelist(&json!({"code": "only"})), ["only"]);
        assert!(parse_codelist(&json!({"meta": {}})).is_empty());
        assert!(parse_codelist(&json!("text")).is_empty());
    }

    #[test]
    fn paginates_locally() {
        let all: Vec<_> = (1..=5).map(|i| summary(&i.to_string(), "c")).collect();
        let query = SearchQuery {
            q: String::new(),
            page: Some(2),
            page_size: Some(2),
        };
        let page: Vec<_> = paginate(all, &query).into_iter().map(|c| c.id).collect();
        assert_eq!(page, vec!["3", "4"]);
    }

    #[tokio::test]
    async fn static_lookup_filters_by_title() {
        let lookup = StaticCatalogue::new(vec![summary("1", "Geschlecht"), summary("2", "Alter")])
            .with_codelist("1", &["1", "2"])
            .with_datasets(vec![DatasetSummary {
                id: "ds".into(),
                title: LangMap::single(Lang::De, "Personen"),
                ..Default::default()
            }]);
        let query = SearchQuery {
            q: "gesch".into(),
            ..Default::default()
        };
        let found = lookup.search(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");

        assert_eq!(lookup.codelist("1").await.unwrap(), ["1", "2"]);
        assert!(lookup.codelist("2").await.unwrap().is_empty());

        let person = SearchQuery {
            q: "PERS".into(),
            ..Default::default()
        };
        assert_eq!(lookup.search_datasets(&person).await.unwrap().len(), 1);
        assert!(lookup
            .search_datasets(&SearchQuery::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unreachable_catalogue_is_a_lookup_error() {
        let client = I14yCatalogueClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9/api/public/v1",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.codelist("c-1").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport(_) | LookupError::Timeout(_)));

        let bad_base = I14yCatalogueClient::new("x", "not a url", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            bad_base.codelist("c-1").await,
            Err(LookupError::Transport(_))
        ));
    }
}
