//! Axum router configuration with middleware.
//!
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/session/{session_id}", get(handlers::session::get_session))
        .route("/ws/session/{session_id}", get(handlers::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use relay_types::config::RelayConfig;
    use relay_types::session::{EventKind, SessionId};
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        AppState::init(RelayConfig::default(), None).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_in_memory() {
        let router = build_router(test_state().await);
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "in-memory");
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let router = build_router(test_state().await);
        let response = router
            .oneshot(
                Request::get("/api/session/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["errors"][0]["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_known_session_returns_record_and_history() {
        let state = test_state().await;
        let id = SessionId::from("s1");
        let store = state.coordinator.store();
        store.create_session(&id, Some("user1")).await;
        store.log_event(&id, EventKind::UserMessage, "hello").await;

        let response = build_router(state)
            .oneshot(Request::get("/api/session/s1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["session"]["session_id"], "s1");
        assert_eq!(json["data"]["session"]["user_id"], "user1");
        assert_eq!(json["data"]["events"][0]["content"], "hello");
        assert_eq!(json["data"]["live"], false);
        assert_eq!(json["data"]["message_count"], 0);
    }
}
