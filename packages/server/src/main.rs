//! `i14y-structure-server`: HTTP editing service for I14Y data structures.
//!
//! # Quick start
//!
//! ```sh
//! # Default port 5000, catalogue lookups against the public I14Y APIs:
//! i14y-structure-server
//!
//! # Custom bind address and shorter session lifetime:
//! I14Y_BIND=127.0.0.1:8080 I14Y_SESSION_TTL_SECS=900 i14y-structure-server
//! ```
//!
//! # Environment variables
//!
//! See [`i14y_structure_server::ServerConfig`] for the full list.

use std::sync::Arc;

use i14y_structure_server::{
    build_router, catalogue::UnavailableCatalogue, run_sweeper, AppState, CatalogueLookup,
    I14yCatalogueClient, ServerConfig,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "i14y_structure_server=info,i14y_structure=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!("config: {e}");
        std::process::exit(2);
    });

    let catalogue: Arc<dyn CatalogueLookup> = match I14yCatalogueClient::new(
        config.catalogue_api.clone(),
        config.public_api.clone(),
        config.catalogue_timeout,
    ) {
        Ok(client) => {
            tracing::info!(
                "catalogue: search at {}, code lists at {} (timeout {}s)",
                config.catalogue_api,
                config.public_api,
                config.catalogue_timeout.as_secs()
            );
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!("catalogue: lookups disabled: {e}");
            Arc::new(UnavailableCatalogue)
        }
    };

    let state = AppState::new(config.clone(), catalogue);

    // Spawn the background session eviction loop.
    {
        let sessions = Arc::clone(&state.sessions);
        tracing::info!(
            "sessions: sweep every {}s, ttl {}s",
            config.sweep_interval.as_secs(),
            config.session_ttl.as_secs()
        );
        tokio::spawn(run_sweeper(sessions, config.sweep_interval));
    }

    let app = build_router(state);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    axum::serve(listener, app).await.expect("server error");
}
