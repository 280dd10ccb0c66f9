// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, exam_submission, question, question_group},
    state::AppState,
    utils::{
        jwt::{auth_middleware, permission_middleware},
        rate_limit::rate_limit_middleware,
    },
};

/// Assembles the main application router.
///
/// * Nests the sub-routers (authentication, questions, groups, exam results).
/// * Guards them with authentication and permission middleware as needed.
/// * Applies global middleware (rate limit, Trace, CORS).
/// * Trims trailing slashes before routing.
pub fn create_router(state: AppState) -> NormalizePath<Router> {
    let origins: Vec<HeaderValue> = state
        .config
        .frontend_url
        .parse::<HeaderValue>()
        .into_iter()
        .collect();
    if origins.is_empty() {
        tracing::warn!(
            "FRONTEND_URL '{}' is not a valid origin, CORS disabled",
            state.config.frontend_url
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let authenticated = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    let authorized = || middleware::from_fn_with_state(state.clone(), permission_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/send-otp", post(auth::send_email_otp))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/verify-otp", post(auth::verify_email_otp))
                .layer(authenticated()),
        );

    let question_routes = Router::new()
        .route("/upload-questions", post(question::create_questions))
        .route("/get-questions", get(question::list_questions))
        .route("/get-question/{id}", get(question::get_question))
        .route("/update-question/{id}", put(question::update_question))
        .route("/delete-question/{id}", delete(question::delete_question))
        // Double middleware protection: Auth first, then permission check
        .layer(authorized())
        .merge(Router::new().route("/random-group", get(question::get_random_group)))
        .layer(authenticated());

    let group_routes = Router::new()
        .route(
            "/",
            get(question_group::list_groups).post(question_group::create_group),
        )
        .route(
            "/{id}",
            get(question_group::get_group)
                .put(question_group::update_group)
                .delete(question_group::delete_group),
        )
        .layer(authorized())
        .layer(authenticated());

    // Any signed-in user may submit an attempt; reading and editing results needs permission.
    let exam_result_routes = Router::new()
        .route(
            "/",
            post(exam_submission::create_submission)
                .merge(get(exam_submission::list_submissions).layer(authorized())),
        )
        .route(
            "/{id}",
            get(exam_submission::get_submission)
                .put(exam_submission::update_submission)
                .delete(exam_submission::delete_submission)
                .layer(authorized()),
        )
        .layer(authenticated());

    let router = Router::new()
        .nest("/api/authentication", auth_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/group-questions", group_routes)
        .nest("/api/exam-result", exam_result_routes)
        // Global Middleware (the last layer added runs first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Wraps the router so `/api/exam-result/` and `/api/exam-result` route alike.
    NormalizePathLayer::trim_trailing_slash().layer(router)
}
