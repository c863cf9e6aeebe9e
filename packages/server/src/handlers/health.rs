//! `GET /health`

use axum::{extract::State, Json};
use i14y_structure_api::HealthResponse;

use super::AppState;

/// Liveness check. Does not create a session.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        sessions: state.sessions.len(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::handlers::test_support::{app, json, send};
    use crate::sessions::SESSION_HEADER;

    #[tokio::test]
    async fn health_counts_sessions_without_creating_one() {
        let app = app();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(SESSION_HEADER).is_none());
        let body = json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);

        send(&app, "GET", "/graph", None).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let body = json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(body["sessions"], 1);
    }
}
