//! Edge handlers: connect, change cardinality, disconnect.

use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use i14y_structure_api::{CardinalityRequest, ConnectRequest, EdgeResponse, SuccessResponse};

use crate::{error::AppError, sessions::Session};

/// `POST /connect`: make `target` a property of `source`.
///
/// Self-loops, edges into a dataset and cycles are rejected with 400, a
/// second edge between the same pair with 409.
pub async fn connect(
    Extension(session): Extension<Arc<Session>>,
    Json(req): Json<ConnectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let edge = session.with_graph(|g| g.connect(&req.source, &req.target, req.cardinality))?;
    Ok((StatusCode::CREATED, Json(EdgeResponse::new(edge))))
}

/// `PUT /edges/{id}`
pub async fn set_cardinality(
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(req): Json<CardinalityRequest>,
) -> Result<Json<EdgeResponse>, AppError> {
    let edge = session.with_graph(|g| g.set_cardinality(&id, req.cardinality))?;
    Ok(Json(EdgeResponse::new(edge)))
}

/// `DELETE /edges/{id}`
pub async fn remove(
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    session.with_graph(|g| g.disconnect(&id))?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::Router;
    use serde_json::json;

    use crate::handlers::test_support::{app, call, dataset_id};

    async fn create(app: &Router, kind: &str, title: &str) -> String {
        let (_, body) = call(
            app,
            "POST",
            "/nodes",
            Some(json!({"type": kind, "title": title})),
        )
        .await;
        body["node"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn connect_then_duplicate_conflicts() {
        let app = app();
        let ds = dataset_id(&app).await;
        let el = create(&app, "data_element", "Name").await;

        let (status, body) = call(
            &app,
            "POST",
            "/connect",
            Some(json!({"source": ds, "target": el})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["edge"]["cardinality"], "1..1");

        let (status, body) = call(
            &app,
            "POST",
            "/connect",
            Some(json!({"source": ds, "target": el})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");
    }

    #[tokio::test]
    async fn connect_rejects_cycles() {
        let app = app();
        let a = create(&app, "class", "A").await;
        let b = create(&app, "class", "B").await;
        let (status, _) = call(
            &app,
            "POST",
            "/connect",
            Some(json!({"source": a, "target": b})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &app,
            "POST",
            "/connect",
            Some(json!({"from": b, "to": a})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidArgument");
    }

    #[tokio::test]
    async fn cardinality_update_and_disconnect() {
        let app = app();
        let ds = dataset_id(&app).await;
        let el = create(&app, "data_element", "Name").await;
        let (_, body) = call(
            &app,
            "POST",
            "/connect",
            Some(json!({"source": ds, "target": el})),
        )
        .await;
        let edge = body["edge"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "PUT",
            &format!("/edges/{edge}"),
            Some(json!({"cardinality": "0..n"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["edge"]["cardinality"], "0..n");

        let (status, _) = call(&app, "DELETE", &format!("/edges/{edge}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, "DELETE", &format!("/edges/{edge}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }
}
