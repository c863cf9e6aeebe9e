//! Assembles the Axum [`Router`] from all handler modules.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{catalogue, edges, graph, health, import, nodes, AppState},
    sessions::session_middleware,
};

/// Build the complete application router with shared state.
///
/// Every route except `/health` runs inside the session middleware and sees
/// the caller's session as an `Extension`.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let editor = Router::new()
        // Nodes
        .route("/nodes", post(nodes::create))
        .route("/nodes/{id}", put(nodes::update).delete(nodes::remove))
        .route("/nodes/{id}/position", post(nodes::position))
        .route(
            "/nodes/{id}/convert-to-dataset",
            post(nodes::convert_to_dataset),
        )
        .route("/nodes/{id}/concept", post(nodes::apply_concept))
        // Edges
        .route("/connect", post(edges::connect))
        .route(
            "/edges/{id}",
            put(edges::set_cardinality).delete(edges::remove),
        )
        // Whole graph
        .route("/graph", get(graph::get_graph))
        .route("/export/ttl", get(graph::export_ttl))
        // Imports
        .route("/import/csv", post(import::csv))
        .route("/import/xsd", post(import::xsd))
        .route("/import/ttl", post(import::ttl))
        // Projects
        .route("/project/save", get(graph::save_project))
        .route("/project/load", post(import::load_project))
        .route("/project/new", post(graph::new_project))
        // Catalogue
        .route("/concepts/search", get(catalogue::search))
        .route("/datasets/search", get(catalogue::search_datasets))
        .route("/dataset/link", post(catalogue::link_dataset))
        .route("/dataset/unlink", post(catalogue::unlink_dataset))
        .layer(from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(editor)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
