//! Whole-graph handlers: read, Turtle export, project save and reset.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use i14y_structure::{project, turtle, GraphData};
use i14y_structure_api::{GraphResponse, NewProjectRequest};
use tracing::info;

use super::AppState;
use crate::{
    error::AppError,
    sessions::{starter_graph, Session, DEFAULT_DATASET_TITLE},
};

/// `GET /graph`: the session graph as `{nodes, edges}`.
pub async fn get_graph(Extension(session): Extension<Arc<Session>>) -> Json<GraphData> {
    Json(session.with_graph(|g| g.snapshot()))
}

/// `GET /export/ttl`: the session graph as a SHACL Turtle download.
///
/// Fails with 422 `NoDatasetFound` when the graph has no dataset.
pub async fn export_ttl(
    Extension(session): Extension<Arc<Session>>,
) -> Result<Response, AppError> {
    let data = session.with_graph(|g| g.snapshot());
    let ttl = turtle::serialize(&data, &turtle::ExportOptions::default())?;
    let file_name = turtle::export_file_name(&data)?;
    info!(
        "export: session {} wrote {} ({} bytes)",
        session.id(),
        file_name,
        ttl.len()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/turtle; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file_name)),
        ],
        ttl,
    )
        .into_response())
}

/// `GET /project/save`: the session graph as a project file download.
pub async fn save_project(
    Extension(session): Extension<Arc<Session>>,
) -> Result<Response, AppError> {
    let saved_at = Utc::now();
    let file = session.with_graph(|g| project::save(g, saved_at));
    let body = file
        .to_json()
        .map_err(|e| AppError::BadRequest(format!("cannot encode project: {e}")))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&project::file_name(saved_at))),
        ],
        body,
    )
        .into_response())
}

/// `POST /project/new`: discard the session graph and start over with a
/// single dataset. The body is optional.
pub async fn new_project(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    body: Bytes,
) -> Result<Json<GraphResponse>, AppError> {
    let req: NewProjectRequest = if body.iter().all(u8::is_ascii_whitespace) {
        NewProjectRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))?
    };
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_DATASET_TITLE);
    let lang = req.lang.unwrap_or(state.config.default_lang);

    let graph = starter_graph(title, lang);
    let data = graph.snapshot();
    session.replace_graph(graph);
    info!("project: session {} started over with {title:?}", session.id());
    Ok(Json(GraphResponse {
        success: true,
        graph: data,
    }))
}

fn attachment(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
