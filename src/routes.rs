// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, catalog, exam, reports},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (catalog, exam, reports, admin).
/// * Every route requires a bearer token; admin routes also require the admin role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let catalog_routes = Router::new()
        .route("/classes", get(catalog::list_classes))
        .route("/classes/{class}/subjects", get(catalog::list_subjects))
        .route(
            "/classes/{class}/subjects/{subject}/lessons",
            get(catalog::list_lessons),
        );

    let exam_routes = Router::new()
        .route("/sessions", post(exam::start_session))
        .route(
            "/sessions/{id}",
            get(exam::get_session).delete(exam::cancel),
        )
        .route("/sessions/{id}/answer", put(exam::answer))
        .route("/sessions/{id}/next", post(exam::next))
        .route("/sessions/{id}/previous", post(exam::previous))
        .route("/sessions/{id}/submit", post(exam::submit));

    let admin_routes = Router::new()
        .route("/classes", post(admin::create_class))
        .route(
            "/classes/{class}",
            put(admin::rename_class).delete(admin::delete_class),
        )
        .route("/classes/{class}/subjects", post(admin::create_subject))
        .route(
            "/classes/{class}/subjects/{subject}",
            put(admin::rename_subject).delete(admin::delete_subject),
        )
        .route(
            "/classes/{class}/subjects/{subject}/lessons",
            post(admin::create_lesson),
        )
        .route(
            "/classes/{class}/subjects/{subject}/lessons/{lesson}",
            put(admin::rename_lesson).delete(admin::delete_lesson),
        )
        .route(
            "/classes/{class}/subjects/{subject}/lessons/{lesson}/questions",
            post(admin::upload_questions),
        )
        .layer(middleware::from_fn(admin_middleware));

    let api = Router::new()
        .nest("/catalog", catalog_routes)
        .nest("/exam", exam_routes)
        .route("/reports", get(reports::list_reports))
        .nest("/admin", admin_routes)
        // Auth runs before the admin check nested above.
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
