use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::auth::require_auth;
use crate::AppState;

/// Room for the multipart framing and text fields around the file part
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router<()> {
    let upload_limit = usize::try_from(state.config.limits.max_upload_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // Routes that require a bearer token
    let protected = Router::new()
        .route(
            "/api/v1/content/upload",
            post(handlers::upload_content).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/content/myuploads", get(handlers::my_uploads))
        .route(
            "/api/v1/content/notes",
            get(handlers::get_note)
                .post(handlers::save_note)
                .delete(handlers::delete_note),
        )
        .route(
            "/api/v1/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    let mut router = Router::new()
        // Auth
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/forgot-password", post(handlers::forgot_password))
        .route("/api/auth/reset-password", post(handlers::reset_password))
        // Content
        .route("/api/v1/content/all", get(handlers::all_content))
        .route("/uploads/:key", get(handlers::serve_upload))
        // Interview practice
        .route("/api/interview/generate", post(handlers::generate_questions))
        .route("/api/interview/feedback", post(handlers::generate_feedback))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .merge(protected);

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled. The purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    let router = match HeaderValue::from_str(&state.config.server.cors_origin) {
        Ok(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        Err(_) => {
            tracing::warn!(origin = %state.config.server.cors_origin, "Invalid CORS origin, CORS disabled");
            router
        }
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
