// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, assignment, quiz, registration, stream},
    state::AppState,
    utils::jwt::admin_guard,
};

/// Assembles the main application router.
///
/// * Student routes (listing, registration, streaming, submission) are open.
/// * Admin routes sit behind the bearer-token gate.
/// * Anything else falls through to the static frontend directory.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::RANGE])
        .expose_headers([
            header::ACCEPT_RANGES,
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
        ]);

    let student_routes = Router::new()
        .route("/admin-login", post(admin::admin_login))
        .route("/assignments", get(assignment::list_assignments))
        .route("/questions", get(assignment::list_questions))
        .route("/register", post(registration::register))
        .route("/stream/{assignment_id}", get(stream::stream_audio))
        .route("/submit", post(quiz::submit_answers));

    let admin_routes = Router::new()
        .route(
            "/assignment",
            post(admin::create_assignment)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/question", post(admin::create_question))
        .route("/question/{id}", delete(admin::delete_question))
        .route("/users", get(admin::list_users))
        .route("/answers", get(admin::list_answers))
        .route("/export.csv", get(admin::export_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard));

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .nest("/api", student_routes.merge(admin_routes))
        .fallback_service(static_files)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
