//! Fault → response translation and the `request_failed` record.

use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::faults::envelope::ErrorEnvelope;
use crate::faults::fault::Fault;
use crate::http::request::RequestContext;
use crate::observability::{Level, LogCategory, LogEmitter, LogRecord};

/// Build the client response for `fault` and log it.
///
/// `request_info` is the redacted request capture taken on entry. The
/// server-side record always holds the real message and, for 5xx faults,
/// the backtrace; `debug` only affects what the client sees.
pub fn translate(
    fault: &Fault,
    context: &RequestContext,
    request_info: &Value,
    elapsed: Duration,
    debug: bool,
    emitter: &LogEmitter,
) -> Response {
    let kind = fault.kind();
    let status = kind.status();

    let (level, prefix) = if status.is_server_error() {
        (Level::Error, "Server Error")
    } else {
        (Level::Warning, "Client Error")
    };

    let mut record = LogRecord::new(
        level,
        format!("{prefix}: {} - {}", kind.type_name(), fault.message()),
        crate::source_location!(),
    )
    .request_id(context.request_id())
    .event("request_failed")
    .field("status_code", status.as_u16())
    .field("processing_time", elapsed.as_secs_f64())
    .field("error_type", fault.error_type())
    .field("error_message", fault.message())
    .field("request_info", request_info.clone());

    if status.is_server_error() {
        if let Some(backtrace) = fault.backtrace() {
            record = record.field("traceback", backtrace);
        }
    }
    emitter.emit(LogCategory::Request, &record);

    ErrorEnvelope::for_request(fault, context, debug).into_response(status)
}
