//! The request/response interceptor.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;
use serde_json::Value;

use crate::faults::{panic::fault_from_panic, translate, Fault, FaultKind, RaisedFault};
use crate::http::middleware::{MiddlewareState, RequestPolicy};
use crate::http::request::{capture_request, snapshot_body, BodySnapshot, RequestContext};
use crate::http::response::{attach_correlation_headers, capture_response, snapshot_response};
use crate::observability::{Level, LogCategory, LogEmitter, LogRecord};

/// Log the request, run the rest of the stack, then log exactly one of
/// `request_completed` or `request_failed`.
pub async fn request_logger(
    State(state): State<MiddlewareState>,
    request: Request,
    next: Next,
) -> Response {
    let policy = state.policy();
    let emitter = state.emitter();

    let (mut parts, body) = request.into_parts();
    let context = RequestContext::from_parts(&parts);
    let request_id = context.request_id();

    let (body, snapshot) = snapshot_body(&parts.headers, body, policy.body_capture_limit).await;
    if snapshot == BodySnapshot::Omitted {
        tracing::warn!(
            request_id = %request_id,
            limit = policy.body_capture_limit,
            "Request body not captured for logging"
        );
    }
    let request_data = capture_request(&parts, &context, &snapshot, &policy.redactor);

    emitter.emit(
        LogCategory::Request,
        &LogRecord::new(
            Level::Info,
            format!(
                "Request Started - ID: {} - {} {}",
                request_id,
                context.method(),
                context.path()
            ),
            crate::source_location!(),
        )
        .request_id(request_id)
        .event("request_started")
        .field("request_data", request_data.clone()),
    );

    parts.extensions.insert(context.clone());
    let request = Request::from_parts(parts, body);

    let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    let elapsed = context.elapsed();

    let mut response = match outcome {
        Ok(response) => match response.extensions().get::<RaisedFault>().cloned() {
            Some(RaisedFault(fault)) => {
                translate(&fault, &context, &request_data, elapsed, policy.debug, emitter)
            }
            None if is_unformatted_error(&response) => {
                let fault = fault_from_response(response, policy.body_capture_limit).await;
                translate(&fault, &context, &request_data, elapsed, policy.debug, emitter)
            }
            None => {
                return complete(response, &context, elapsed, &policy, emitter).await;
            }
        },
        Err(payload) => {
            let fault = fault_from_panic(payload);
            tracing::error!(request_id = %request_id, error = %fault, "Handler panicked");
            translate(&fault, &context, &request_data, elapsed, policy.debug, emitter)
        }
    };

    attach_correlation_headers(response.headers_mut(), request_id, elapsed);
    response
}

/// An error status that did not come from a [`Fault`] and is not already a
/// JSON body, e.g. the 408 of the timeout layer or the 413 of the body
/// limit.
fn is_unformatted_error(response: &Response) -> bool {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    (status.is_client_error() || status.is_server_error()) && !is_json
}

/// Classify an unformatted error response by status, keeping its text body
/// as the message when there is one.
async fn fault_from_response(response: Response, limit: usize) -> Fault {
    let status = response.status();
    let (_, body) = snapshot_response(response, limit).await;
    let message = body
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
    Fault::new(FaultKind::from_status(status), message)
}

async fn complete(
    response: Response,
    context: &RequestContext,
    elapsed: Duration,
    policy: &RequestPolicy,
    emitter: &LogEmitter,
) -> Response {
    let status = response.status();

    let (mut response, body) = if status.as_u16() >= 400 || policy.debug {
        snapshot_response(response, policy.body_capture_limit).await
    } else {
        (response, None)
    };
    attach_correlation_headers(response.headers_mut(), context.request_id(), elapsed);
    let response_data = capture_response(&response, body, &policy.redactor);
    let seconds = elapsed.as_secs_f64();

    emitter.emit(
        LogCategory::Request,
        &LogRecord::new(
            Level::for_status(status.as_u16()),
            format!(
                "Request Completed - ID: {} - Status: {} - Time: {:.3}s",
                context.request_id(),
                status.as_u16(),
                seconds
            ),
            crate::source_location!(),
        )
        .request_id(context.request_id())
        .event("request_completed")
        .field("status_code", status.as_u16())
        .field("processing_time", seconds)
        .field("response_data", response_data),
    );

    response
}
