//! Node handlers: create, update, delete, reposition, convert, link concept.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use i14y_structure::{Error, NodePatch};
use i14y_structure_api::{
    ApplyConceptRequest, CreateNodeRequest, NodeResponse, PositionRequest, SuccessResponse,
};
use tracing::{debug, warn};

use super::AppState;
use crate::{error::AppError, sessions::Session};

/// `POST /nodes`: create a node, optionally attached below `parent_id`.
///
/// Returns HTTP 201 with the node and, when a parent was given, the new edge.
pub async fn create(
    Extension(session): Extension<Arc<Session>>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = req.fields();
    let resp = session.with_graph(|g| match req.parent_id.as_deref() {
        Some(parent) => g
            .add_child(parent, req.kind, fields, req.cardinality)
            .map(|(node, edge)| NodeResponse::with_edge(node, edge)),
        None => g.add_node(req.kind, fields).map(NodeResponse::new),
    })?;
    debug!("nodes: session {} created {} {}", session.id(), resp.node.kind, resp.node.id);
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `PUT /nodes/{id}`: merge a partial update into a node.
pub async fn update(
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(patch): Json<NodePatch>,
) -> Result<Json<NodeResponse>, AppError> {
    let node = session.with_graph(|g| g.update_node(&id, patch))?;
    Ok(Json(NodeResponse::new(node)))
}

/// `DELETE /nodes/{id}`: remove a node and its edges. The only dataset is
/// protected (403).
pub async fn remove(
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    session.with_graph(|g| g.delete_node(&id))?;
    debug!("nodes: session {} deleted {id}", session.id());
    Ok(Json(SuccessResponse::ok()))
}

/// `POST /nodes/{id}/position`: store a canvas position.
pub async fn position(
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(req): Json<PositionRequest>,
) -> Result<Json<NodeResponse>, AppError> {
    let node = session.with_graph(|g| g.set_position(&id, req.x, req.y))?;
    Ok(Json(NodeResponse::new(node)))
}

/// `POST /nodes/{id}/convert-to-dataset`: promote a class to a dataset.
pub async fn convert_to_dataset(
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
) -> Result<Json<NodeResponse>, AppError> {
    let node = session.with_graph(|g| g.convert_class_to_dataset(&id))?;
    Ok(Json(NodeResponse::new(node)))
}

/// `POST /nodes/{id}/concept`: link a data element to a catalogue concept.
///
/// For code list concepts the codes are fetched first; when the catalogue
/// cannot deliver them the request fails with 503 and the graph is left
/// unchanged.
pub async fn apply_concept(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(req): Json<ApplyConceptRequest>,
) -> Result<Json<NodeResponse>, AppError> {
    let codes = if req.concept.has_code_list() {
        state.catalogue.codelist(&req.concept.id).await.map_err(|e| {
            warn!("catalogue: code list of {} failed: {e}", req.concept.id);
            Error::from(e)
        })?
    } else {
        Vec::new()
    };
    debug!("concept {}: {} codes", req.concept.id, codes.len());

    let concept = req.concept.to_concept_ref();
    let facets = req.concept.facets(codes);
    let node = session.with_graph(|g| g.apply_concept(&id, concept, facets))?;
    Ok(Json(NodeResponse::new(node)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use std::sync::Arc;

    use crate::catalogue::UnavailableCatalogue;
    use crate::config::ServerConfig;
    use crate::handlers::test_support::{app, call, concept, dataset_id};
    use crate::handlers::AppState;
    use crate::router::build_router;

    async fn element(app: &axum::Router, title: &str) -> String {
        let ds = dataset_id(app).await;
        let (_, created) = call(
            app,
            "POST",
            "/nodes",
            Some(json!({"type": "data_element", "title": {"de": title}, "parent_id": ds})),
        )
        .await;
        created["node"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_under_parent_returns_node_and_edge() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (status, body) = call(
            &app,
            "POST",
            "/nodes",
            Some(json!({
                "type": "data_element",
                "title": {"de": "Name", "en": "Name"},
                "parent_id": ds,
                "cardinality": "0..1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["node"]["type"], "data_element");
        assert_eq!(body["edge"]["from"], ds.as_str());
        assert_eq!(body["edge"]["cardinality"], "0..1");
    }

    #[tokio::test]
    async fn create_without_title_is_invalid() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/nodes",
            Some(json!({"type": "class", "title": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "InvalidArgument");
    }

    #[tokio::test]
    async fn create_under_unknown_parent_is_not_found() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/nodes",
            Some(json!({"type": "class", "title": "Adresse", "parent_id": "missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }

    #[tokio::test]
    async fn update_merges_languages() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (status, body) = call(
            &app,
            "PUT",
            &format!("/nodes/{ds}"),
            Some(json!({"title": {"fr": "Personnes"}, "version": "2.0.0"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node"]["title"]["de"], "New Dataset");
        assert_eq!(body["node"]["title"]["fr"], "Personnes");
        assert_eq!(body["node"]["version"], "2.0.0");
    }

    #[tokio::test]
    async fn deleting_only_dataset_is_protected() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (status, body) = call(&app, "DELETE", &format!("/nodes/{ds}"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Protected");
    }

    #[tokio::test]
    async fn delete_removes_node_and_edges() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (_, created) = call(
            &app,
            "POST",
            "/nodes",
            Some(json!({"type": "data_element", "title": "Alter", "parent_id": ds})),
        )
        .await;
        let id = created["node"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "DELETE", &format!("/nodes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (_, graph) = call(&app, "GET", "/graph", None).await;
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 1);
        assert!(graph["edges"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn position_is_clamped() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (_, body) = call(
            &app,
            "POST",
            &format!("/nodes/{ds}/position"),
            Some(json!({"x": 1.5, "y": 0.25})),
        )
        .await;
        assert_eq!(body["node"]["position"]["x"], 1.0);
        assert_eq!(body["node"]["position"]["y"], 0.25);
    }

    #[tokio::test]
    async fn class_converts_to_dataset() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (_, created) = call(
            &app,
            "POST",
            "/nodes",
            Some(json!({"type": "class", "title": "Adresse", "parent_id": ds})),
        )
        .await;
        let id = created["node"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "POST",
            &format!("/nodes/{id}/convert-to-dataset"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node"]["type"], "dataset");

        let (_, graph) = call(&app, "GET", "/graph", None).await;
        assert!(graph["edges"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn applying_concept_fills_title_and_datatype() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (_, created) = call(
            &app,
            "POST",
            "/nodes",
            Some(json!({"type": "data_element", "title": {"en": "Birth date"}, "parent_id": ds})),
        )
        .await;
        let id = created["node"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "POST",
            &format!("/nodes/{id}/concept"),
            Some(json!({"concept": concept("c-2", "Geburtsdatum", "Date")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let node = &body["node"];
        assert_eq!(node["title"]["en"], "Birth date");
        assert_eq!(node["title"]["de"], "Geburtsdatum");
        assert_eq!(node["constraints"]["datatype"], "date");
        assert_eq!(
            node["concept_ref"]["uri"],
            "https://www.i14y.admin.ch/catalog/concepts/c-2/description"
        );
    }

    #[tokio::test]
    async fn concept_on_class_is_invalid() {
        let app = app();
        let ds = dataset_id(&app).await;
        let (status, body) = call(
            &app,
            "POST",
            &format!("/nodes/{ds}/concept"),
            Some(json!({"concept": concept("c-1", "Geschlecht", "CodeList")})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidArgument");
    }

    #[tokio::test]
    async fn code_list_concept_fills_in_values_and_facets() {
        let app = app();
        let id = element(&app, "Geschlecht").await;
        let mut sex = concept("c-1", "Geschlecht", "CodeList");
        sex.max_length = Some(1);

        let (status, body) = call(
            &app,
            "POST",
            &format!("/nodes/{id}/concept"),
            Some(json!({"concept": sex})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let constraints = &body["node"]["constraints"];
        assert_eq!(constraints["in_values"], json!(["1", "2", "3"]));
        assert_eq!(constraints["max_length"], 1);
    }

    #[tokio::test]
    async fn code_list_fetch_failure_is_503_and_node_unchanged() {
        let app = build_router(AppState::new(
            ServerConfig::default(),
            Arc::new(UnavailableCatalogue),
        ));
        let id = element(&app, "Geschlecht").await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/nodes/{id}/concept"),
            Some(json!({"concept": concept("c-1", "Geschlecht", "CodeList")})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "UpstreamUnavailable");

        let (_, graph) = call(&app, "GET", "/graph", None).await;
        let node = graph["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == id.as_str())
            .unwrap();
        assert!(node.get("concept_ref").is_none());

        // Concepts without a code list need no catalogue round trip.
        let (status, _) = call(
            &app,
            "POST",
            &format!("/nodes/{id}/concept"),
            Some(json!({"concept": concept("c-2", "Geburtsdatum", "Date")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
