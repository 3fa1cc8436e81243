//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Per-request span with the path only; the `/ws` query string carries a session token.
fn request_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        version = ?req.version(),
    )
}

/// Build the application router with:
/// - WebSocket assistant at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Session
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/auth/signup", post(http::http_sign_up))
        .route("/api/v1/auth/signin", post(http::http_sign_in))
        .route("/api/v1/auth/signout", post(http::http_sign_out))
        .route("/api/v1/me", get(http::http_me))
        .route("/api/v1/me/profile", put(http::http_complete_profile))
        // Catalog
        .route("/api/v1/courses", get(http::http_list_courses).post(http::http_create_course))
        .route("/api/v1/courses/:course_id", get(http::http_get_course))
        .route("/api/v1/teacher/courses", get(http::http_teacher_courses))
        .route("/api/v1/courses/:course_id/lectures", post(http::http_add_lecture))
        .route("/api/v1/courses/:course_id/lectures/:lecture_id", delete(http::http_remove_lecture))
        // Ledger
        .route("/api/v1/courses/:course_id/enroll", post(http::http_enroll))
        .route("/api/v1/enrollments", get(http::http_enrollments))
        .route(
            "/api/v1/courses/:course_id/lectures/:lecture_id/complete",
            post(http::http_toggle_completion),
        )
        // Quizzes
        .route("/api/v1/courses/:course_id/lectures/:lecture_id/quiz", post(http::http_submit_quiz))
        .route(
            "/api/v1/courses/:course_id/lectures/:lecture_id/quiz/attempt",
            get(http::http_get_attempt),
        )
        // Assistant
        .route("/api/v1/assistant/chat", post(http::http_assistant_chat))
        .route("/api/v1/assistant/summarize", post(http::http_assistant_summarize))
        .route("/api/v1/assistant/elaborate", post(http::http_assistant_elaborate))
        .route("/api/v1/assistant/quiz", post(http::http_assistant_quiz))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
