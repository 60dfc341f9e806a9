use axum::{routing::get, Router};

use crate::app::handlers;
use crate::app::AppState;

/// Demo API routes, without the middleware.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/api/users/{id}",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/api/example/function-logging", get(handlers::function_logging))
        .route("/api/example/performance-logging", get(handlers::performance_logging))
        .route("/api/example/data-sanitization", get(handlers::data_sanitization))
        .route("/api/example/request-summary", get(handlers::request_summary))
        .route("/api/example/error-logging", get(handlers::error_logging))
        .route("/api/example/validation-error", get(handlers::validation_error))
        .route("/api/example/internal-error", get(handlers::internal_error))
        .route("/api/example/panic", get(handlers::panic_handler))
        .with_state(state)
}
