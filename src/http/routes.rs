use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/api/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route("/api/sessions/:session_id", get(handlers::get_session))
        .route("/api/sessions/:session_id/end", post(handlers::end_session))
        // Artifacts
        .route(
            "/api/sessions/:session_id/artifacts/json",
            get(handlers::get_summary_artifact),
        )
        .route(
            "/api/sessions/:session_id/artifacts/transcript",
            get(handlers::get_transcript_json),
        )
        .route(
            "/api/sessions/:session_id/artifacts/transcript.txt",
            get(handlers::get_transcript_text),
        )
        // Connections
        .route(
            "/api/connections/:session_id",
            post(handlers::open_connection).delete(handlers::close_connection),
        )
        .route(
            "/api/connections/:session_id/status",
            get(handlers::connection_status),
        )
        // Client relay
        .route("/ws/:session_id", get(ws::relay_socket))
        .layer(
            ServiceBuilder::new()
                // Add tracing middleware for request logging
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
