//! Demo route handlers.

use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::app::models::{NewUser, User};
use crate::app::AppState;
use crate::faults::{ApiResult, Fault, FieldErrors, JsonBody};
use crate::http::request::RequestContext;

pub async fn list_users(State(state): State<AppState>, ctx: RequestContext) -> Json<Value> {
    let users = state.store.list(Some(ctx.request_id()));
    Json(json!({ "count": users.len(), "users": users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id?;
    Ok(Json(state.store.get(Some(ctx.request_id()), id)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(new_user): JsonBody<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    new_user.validate().map_err(Fault::validation)?;
    let user = state.store.insert(Some(ctx.request_id()), new_user)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let user = state.store.remove(Some(ctx.request_id()), id)?;
    Ok(Json(json!({ "message": format!("User {} deleted", user.id) })))
}

/// Runs a timed helper through `LogEmitter::instrument`.
pub async fn function_logging(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Json<Value>> {
    let emitter = state.middleware.emitter();
    let result = emitter
        .instrument(
            Some(ctx.request_id()),
            crate::source_location!(),
            "process_data",
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                emitter.performance_metric(
                    Some(ctx.request_id()),
                    crate::source_location!(),
                    "data_processing_time",
                    10.0,
                    "ms",
                );
                Ok::<_, Fault>("processed_data")
            },
        )
        .await?;

    Ok(Json(json!({ "message": "Function logged successfully", "result": result })))
}

pub async fn performance_logging(State(state): State<AppState>, ctx: RequestContext) -> Json<Value> {
    let emitter = state.middleware.emitter();

    let start = Instant::now();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let db_time = start.elapsed().as_secs_f64() * 1000.0;
    emitter.performance_metric(
        Some(ctx.request_id()),
        crate::source_location!(),
        "database_query_time",
        db_time,
        "ms",
    );

    let start = Instant::now();
    tokio::time::sleep(Duration::from_millis(3)).await;
    let api_time = start.elapsed().as_secs_f64() * 1000.0;
    emitter.performance_metric(
        Some(ctx.request_id()),
        crate::source_location!(),
        "external_api_time",
        api_time,
        "ms",
    );

    Json(json!({
        "message": "Performance metrics logged",
        "db_time": format!("{db_time:.2}ms"),
        "api_time": format!("{api_time:.2}ms"),
    }))
}

/// Shows the active redaction policy applied to a sample document.
pub async fn data_sanitization(State(state): State<AppState>) -> Json<Value> {
    let sample = json!({
        "user": {
            "name": "John Doe",
            "email": "john@example.com",
            "password": "secret123",
            "api_key": "sk-1234567890abcdef"
        },
        "request": {
            "token": "jwt_token_here",
            "data": "normal_data"
        }
    });
    let policy = state.middleware.policy();
    Json(json!({
        "message": "Data sanitization example",
        "sanitized_data": policy.redactor.redact(&sample),
    }))
}

pub async fn request_summary(ctx: RequestContext) -> Json<Value> {
    Json(ctx.summary())
}

pub async fn error_logging() -> ApiResult<Json<Value>> {
    Err(Fault::bad_request(
        "This is an example error for testing error logging",
    ))
}

pub async fn validation_error() -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::new();
    errors.insert("email".into(), vec!["Invalid data format".into()]);
    Err(Fault::validation(errors))
}

pub async fn internal_error() -> ApiResult<Json<Value>> {
    Err(Fault::internal("Simulated failure in the example handler"))
}

pub async fn panic_handler() -> Json<Value> {
    panic!("Simulated panic in the example handler");
}
