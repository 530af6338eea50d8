// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{diagnostic, leaderboard, stats, test},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every `/api` route requires a bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let test_routes = Router::new()
        .route("/today", get(test::get_today))
        .route("/start", post(test::start_test))
        .route("/answer", post(test::record_answer))
        .route("/submit", post(test::submit_test))
        .route("/history", get(test::get_history));

    let api_routes = Router::new()
        .nest("/test", test_routes)
        .route("/diagnostic", get(diagnostic::get_diagnostic))
        .route("/stats", get(stats::get_stats))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
