// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assessment, auth, health},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin).allow_credentials(true),
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid CORS_ORIGIN: {}", e);
            cors
        }
        None => cors,
    }
}

/// Assembles the main application router.
///
/// * Public: health probes, candidate login, admin login.
/// * Candidate (bearer token): questions, autosave, resume, submit.
/// * Admin (bearer token with admin role): users, results, audit logs, reseed.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    let candidate_routes = Router::new()
        .route("/questions", get(assessment::list_questions))
        .route("/save-progress", post(assessment::save_progress))
        .route("/user-progress", get(assessment::get_user_progress))
        .route("/submit", post(assessment::submit))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/bulk-delete", post(admin::bulk_delete_users))
        .route("/users/{email}", delete(admin::delete_user))
        .route("/results", get(admin::list_results))
        .route("/results/{email}", delete(admin::delete_result))
        .route("/admin-logs", get(admin::list_admin_logs))
        .route("/admin-logs/{id}", delete(admin::delete_admin_log))
        .route("/questions/reseed", post(admin::reseed_questions))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/login", post(auth::login))
        .route("/api/admin/login", post(auth::admin_login))
        .nest("/api", candidate_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
