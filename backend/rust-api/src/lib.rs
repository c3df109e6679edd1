use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .merge(submission_routes())
        .nest(
            "/admin",
            admin_routes().layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes)),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn submission_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit", post(handlers::submissions::submit_exam))
        .route("/results", get(handlers::submissions::recent_results))
        .route(
            "/results/{username}",
            get(handlers::submissions::results_by_username),
        )
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Student directory
        .route(
            "/students",
            get(handlers::admin::list_students).post(handlers::admin::create_student),
        )
        .route("/students/all", get(handlers::admin::list_all_students))
        .route("/students/upload", post(handlers::admin::upload_students))
        .route(
            "/students/{username}",
            get(handlers::admin::get_student).put(handlers::admin::update_student),
        )
        // Tests
        .route(
            "/tests",
            get(handlers::admin::list_tests).post(handlers::admin::create_test),
        )
        .route("/tests/upload", post(handlers::admin::upload_test))
        .route("/tests/{name}", get(handlers::admin::get_test))
        // Results
        .route("/results", get(handlers::admin::results_by_date))
        .route("/results/{regno}", get(handlers::admin::results_by_regno))
}
