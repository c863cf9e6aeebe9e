//! HTTP request handlers for the editor endpoints.
//!
//! Each submodule covers one group of endpoints. Handlers receive Axum
//! extractors, operate on the caller's session graph under its lock, and
//! return `Result<impl IntoResponse, AppError>`. Parsing of uploads happens
//! before the lock is taken; a failed import leaves the session untouched.

pub mod catalogue;
pub mod edges;
pub mod graph;
pub mod health;
pub mod import;
pub mod nodes;

use std::sync::Arc;

use crate::{catalogue::CatalogueLookup, config::ServerConfig, sessions::SessionStore};

/// Shared application state threaded through all Axum handlers via
/// [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub catalogue: Arc<dyn CatalogueLookup>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig, catalogue: Arc<dyn CatalogueLookup>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(config.session_ttl, config.default_lang)),
            catalogue,
            config,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use i14y_structure::{Lang, LangMap};
    use i14y_structure_api::{ConceptSummary, DatasetSummary};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::AppState;
    use crate::catalogue::StaticCatalogue;
    use crate::config::ServerConfig;
    use crate::router::build_router;
    use crate::sessions::SESSION_HEADER;

    pub const SESSION: &str = "test-session";

    pub fn concept(id: &str, title: &str, value_type: &str) -> ConceptSummary {
        ConceptSummary {
            id: id.into(),
            title: LangMap::single(Lang::De, title),
            publisher_name: Some("BFS".into()),
            value_type: Some(value_type.into()),
            ..Default::default()
        }
    }

    pub fn dataset(id: &str, title: &str) -> DatasetSummary {
        DatasetSummary {
            id: id.into(),
            title: LangMap::single(Lang::De, title),
            publisher_name: Some("BFS".into()),
            ..Default::default()
        }
    }

    pub fn state() -> AppState {
        let catalogue = StaticCatalogue::new(vec![
            concept("c-1", "Geschlecht", "CodeList"),
            concept("c-2", "Geburtsdatum", "Date"),
        ])
        .with_codelist("c-1", &["1", "2", "3"])
        .with_datasets(vec![
            dataset("ds-1", "Gebäude und Wohnungen"),
            dataset("ds-2", "Personen"),
        ]);
        AppState::new(ServerConfig::default(), Arc::new(catalogue))
    }

    pub fn app() -> Router {
        build_router(state())
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(SESSION_HEADER, SESSION);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(req).await.unwrap()
    }

    pub async fn upload(
        app: &Router,
        uri: &str,
        file_name: &str,
        content: &[u8],
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let boundary = "----i14y-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(SESSION_HEADER, SESSION)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    pub async fn json(resp: Response<Body>) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    /// Status and JSON body of a request.
    pub async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let resp = send(app, method, uri, body).await;
        let status = resp.status();
        (status, json(resp).await)
    }

    /// Id of the session's dataset.
    pub async fn dataset_id(app: &Router) -> String {
        let (_, graph) = call(app, "GET", "/graph", None).await;
        graph["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["type"] == "dataset")
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}
