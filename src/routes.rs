// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, instructor, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, instructor_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, modules, quiz, instructor, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let module_routes = Router::new().route("/", get(quiz::list_modules));

    let quiz_routes = Router::new()
        .route("/module/{module_id}/start", post(quiz::start_module_quiz))
        .route("/timed-exam/start", post(quiz::start_timed_exam))
        .route("/adaptive/start", post(quiz::start_adaptive))
        .route("/attempts", get(quiz::list_attempts))
        .route("/analytics", get(quiz::get_analytics))
        .route("/attempt/{attempt_id}", get(quiz::get_attempt))
        .route("/attempt/{attempt_id}/answer", post(quiz::submit_answer))
        .route("/attempt/{attempt_id}/progress", get(quiz::get_progress))
        .route("/attempt/{attempt_id}/finish", post(quiz::finish_attempt))
        .layer(middleware::from_fn(student_middleware))
        .layer(auth_layer.clone());

    let instructor_routes = Router::new()
        .route("/quizzes/{quiz_id}/stats", get(instructor::quiz_stats))
        // Auth first, then role check
        .layer(middleware::from_fn(instructor_middleware))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", post(admin::create_user))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route("/modules", post(admin::create_module))
        .route("/quizzes/{quiz_id}/questions", post(admin::add_quiz_question))
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/modules", module_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/instructor", instructor_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
