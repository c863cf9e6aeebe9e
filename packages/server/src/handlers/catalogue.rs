//! Catalogue endpoints: concept and dataset search, dataset link.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use i14y_structure::Error;
use i14y_structure_api::{
    ConceptSearchResponse, DatasetLinkResponse, DatasetSearchResponse, LinkDatasetRequest,
    SearchQuery,
};
use tracing::{info, warn};

use super::AppState;
use crate::{error::AppError, sessions::Session};

/// `GET /concepts/search`: search the concept catalogue. Upstream failures
/// map to 503 `UpstreamUnavailable` and never touch the session graph.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ConceptSearchResponse>, AppError> {
    let concepts = state.catalogue.search(&query).await.map_err(|e| {
        warn!("catalogue: concept search {:?} failed: {e}", query.q);
        Error::from(e)
    })?;
    Ok(Json(ConceptSearchResponse::new(concepts)))
}

/// `GET /datasets/search`: search published datasets. A blank query yields
/// no results.
pub async fn search_datasets(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<DatasetSearchResponse>, AppError> {
    let datasets = state.catalogue.search_datasets(&query).await.map_err(|e| {
        warn!("catalogue: dataset search {:?} failed: {e}", query.q);
        Error::from(e)
    })?;
    Ok(Json(DatasetSearchResponse::new(datasets)))
}

/// `POST /dataset/link`: link the session's dataset to a catalogue dataset,
/// taking over its title and description.
pub async fn link_dataset(
    Extension(session): Extension<Arc<Session>>,
    Json(req): Json<LinkDatasetRequest>,
) -> Result<Json<DatasetLinkResponse>, AppError> {
    if req.dataset.id.trim().is_empty() {
        return Err(Error::InvalidArgument("dataset id is required".into()).into());
    }
    let dataset = req.dataset.to_dataset_ref();
    let node = session.with_graph(|g| {
        let id = g.dataset().ok_or(Error::NoDatasetFound)?.id.clone();
        g.link_dataset(&id, dataset, &req.dataset.title, &req.dataset.description)
    })?;
    info!("dataset {} linked to catalogue dataset {}", node.id, req.dataset.id);
    Ok(Json(DatasetLinkResponse::new(node)))
}

/// `POST /dataset/unlink`: drop the session dataset's catalogue link.
pub async fn unlink_dataset(
    Extension(session): Extension<Arc<Session>>,
) -> Result<Json<DatasetLinkResponse>, AppError> {
    let node = session.with_graph(|g| {
        let id = g.dataset().ok_or(Error::NoDatasetFound)?.id.clone();
        g.unlink_dataset(&id)
    })?;
    Ok(Json(DatasetLinkResponse::new(node)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::catalogue::UnavailableCatalogue;
    use crate::config::ServerConfig;
    use crate::handlers::test_support::{app, call, dataset, dataset_id};
    use crate::handlers::AppState;
    use crate::router::build_router;

    #[tokio::test]
    async fn search_returns_matching_concepts() {
        let app = app();
        let (status, body) = call(&app, "GET", "/concepts/search?q=geburt", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let concepts = body["concepts"].as_array().unwrap();
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0]["id"], "c-2");
    }

    #[tokio::test]
    async fn upstream_failure_is_503_and_graph_survives() {
        let state = AppState::new(ServerConfig::default(), Arc::new(UnavailableCatalogue));
        let app = build_router(state);
        let before = dataset_id(&app).await;

        let (status, body) = call(&app, "GET", "/concepts/search?q=x", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "UpstreamUnavailable");
        let (status, _) = call(&app, "GET", "/datasets/search?q=x", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(dataset_id(&app).await, before);
    }

    #[tokio::test]
    async fn dataset_search_matches_titles() {
        let app = app();
        let (status, body) = call(&app, "GET", "/datasets/search?q=geb%C3%A4ude", None).await;
        assert_eq!(status, StatusCode::OK);
        let datasets = body["datasets"].as_array().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0]["id"], "ds-1");

        let (_, body) = call(&app, "GET", "/datasets/search?q=", None).await;
        assert_eq!(body["datasets"], json!([]));
    }

    #[tokio::test]
    async fn link_then_unlink_dataset() {
        let app = app();
        let ds = dataset_id(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            "/dataset/link",
            Some(json!({"dataset": dataset("ds-2", "Personenregister")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node"]["id"], ds.as_str());
        assert_eq!(body["node"]["title"]["de"], "Personenregister");
        assert_eq!(body["node"]["dataset_ref"]["id"], "ds-2");
        assert_eq!(
            body["node"]["dataset_ref"]["uri"],
            "https://www.i14y.admin.ch/catalog/datasets/ds-2/description"
        );

        let resp = crate::handlers::test_support::send(&app, "GET", "/export/ttl", None).await;
        let ttl = String::from_utf8(crate::handlers::test_support::body_bytes(resp).await).unwrap();
        assert!(ttl.contains("dcterms:identifier \"ds-2\""));

        let (status, body) = call(&app, "POST", "/dataset/unlink", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["node"].get("dataset_ref").is_none());
        assert_eq!(body["node"]["title"]["de"], "Personenregister");

        let (status, body) = call(&app, "POST", "/dataset/unlink", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidArgument");
    }

    #[tokio::test]
    async fn link_requires_an_id() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/dataset/link",
            Some(json!({"dataset": dataset(" ", "X")})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidArgument");
    }
}
