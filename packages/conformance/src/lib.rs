//! Shared helpers for the I14Y structure editor conformance test suite.
//!
//! Provides [`spawn_server`]: a function that binds a `TcpListener` on an
//! ephemeral port, wires up an in-process server with a fixed catalogue,
//! and returns both the local URL and the session store so tests can
//! inspect and sweep sessions without going through the HTTP layer.

use std::sync::Arc;

use i14y_structure::{Lang, LangMap};
use i14y_structure_api::{ConceptSummary, DatasetSummary};
use i14y_structure_server::{
    build_router, AppState, CatalogueLookup, ServerConfig, SessionStore, StaticCatalogue,
};

fn lang_pair(de: &str, fr: &str) -> LangMap {
    [(Lang::De, de.to_string()), (Lang::Fr, fr.to_string())]
        .into_iter()
        .collect()
}

/// The catalogue served by [`spawn_server`]: three concepts, the code list
/// of `08d93fc7` and two datasets.
pub fn catalogue() -> StaticCatalogue {
    let concept = |id: &str, de: &str, fr: &str, value_type: &str| ConceptSummary {
        id: id.into(),
        title: lang_pair(de, fr),
        publisher_name: Some("BFS".into()),
        value_type: Some(value_type.into()),
        ..Default::default()
    };
    let dataset = |id: &str, de: &str, fr: &str| DatasetSummary {
        id: id.into(),
        title: lang_pair(de, fr),
        publisher_name: Some("BFS".into()),
        ..Default::default()
    };
    StaticCatalogue::new(vec![
        concept("08d93fc7", "Geschlecht", "Sexe", "CodeList"),
        concept("1a2b3c4d", "Geburtsdatum", "Date de naissance", "Date"),
        concept("5e6f7a8b", "Anzahl Kinder", "Nombre d'enfants", "Numeric"),
    ])
    .with_codelist("08d93fc7", &["1", "2", "3"])
    .with_datasets(vec![
        dataset("0f1e2d3c", "Gebäude- und Wohnungsregister", "Registre des bâtiments"),
        dataset("4b5a6978", "Personenregister", "Registre des personnes"),
    ])
}

/// Start an ephemeral in-process server and return `(base_url, sessions)`.
///
/// The server runs in a background `tokio` task and is bound to an
/// OS-assigned port on `127.0.0.1`. Catalogue lookups are answered from
/// [`catalogue`].
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails to start.
pub async fn spawn_server() -> (String, Arc<SessionStore>) {
    spawn_server_with(Arc::new(catalogue())).await
}

/// Like [`spawn_server`], with a caller-supplied catalogue.
pub async fn spawn_server_with(
    catalogue: Arc<dyn CatalogueLookup>,
) -> (String, Arc<SessionStore>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let config = ServerConfig {
        bind_addr: addr,
        ..ServerConfig::default()
    };
    let state = AppState::new(config, catalogue);
    let sessions = Arc::clone(&state.sessions);
    let router = build_router(state);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    (base_url, sessions)
}
