//! The [`Fault`] type handlers return, and conversions into it.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, Request,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::faults::envelope::ErrorEnvelope;
use crate::faults::kind::FaultKind;

/// Field name → messages, as returned in `validation_errors`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type ApiResult<T> = Result<T, Fault>;

/// Client-visible message for server-side faults.
pub const GENERIC_SERVER_MESSAGE: &str = "An unexpected error occurred";

/// A classified failure raised while handling a request.
///
/// Server-side faults (5xx) capture a backtrace when constructed.
#[derive(Debug)]
pub struct Fault {
    kind: FaultKind,
    message: String,
    validation_errors: Option<FieldErrors>,
    error_type: &'static str,
    backtrace: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        let backtrace = kind
            .is_server_error()
            .then(|| Backtrace::force_capture().to_string());
        Self {
            kind,
            message: message.into(),
            validation_errors: None,
            error_type: kind.variant_name(),
            backtrace,
            source: None,
        }
    }

    /// A validation fault carrying per-field messages.
    pub fn validation(errors: FieldErrors) -> Self {
        Self::new(FaultKind::Validation, "Validation failed").with_validation_errors(errors)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(FaultKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FaultKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Conflict, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Database, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, message)
    }

    pub fn with_validation_errors(mut self, errors: FieldErrors) -> Self {
        self.validation_errors = Some(errors);
        self
    }

    pub fn with_error_type(mut self, error_type: &'static str) -> Self {
        self.error_type = error_type;
        self
    }

    /// Replace the captured backtrace, e.g. with one recorded by the panic hook.
    pub fn with_backtrace(mut self, backtrace: Option<String>) -> Self {
        if backtrace.is_some() {
            self.backtrace = backtrace;
        }
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// The real message; may contain internal detail.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message shown to the client.
    pub fn client_message(&self) -> &str {
        if self.kind.is_server_error() {
            GENERIC_SERVER_MESSAGE
        } else {
            &self.message
        }
    }

    pub fn validation_errors(&self) -> Option<&FieldErrors> {
        self.validation_errors.as_ref()
    }

    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.type_name(), self.message)
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Response extension through which a fault reaches the request logger.
#[derive(Debug, Clone)]
pub struct RaisedFault(pub Arc<Fault>);

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        // Without request context; the request logger rebuilds the body
        // with path, method and request ID.
        let mut response = ErrorEnvelope::standalone(&self).into_response(self.kind.status());
        response.extensions_mut().insert(RaisedFault(Arc::new(self)));
        response
    }
}

/// Classification of domain errors into fault categories.
///
/// Implementing this is enough for `?` to turn the error into a [`Fault`].
pub trait IntoFault: fmt::Display {
    fn fault_kind(&self) -> FaultKind;

    fn fault_message(&self) -> String {
        self.to_string()
    }

    fn field_errors(&self) -> Option<FieldErrors> {
        None
    }
}

impl<E> From<E> for Fault
where
    E: IntoFault + StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let mut fault = Fault::new(error.fault_kind(), error.fault_message())
            .with_error_type(short_type_name::<E>());
        if let Some(errors) = error.field_errors() {
            fault = fault.with_validation_errors(errors);
        }
        fault.with_source(error)
    }
}

impl IntoFault for JsonRejection {
    fn fault_kind(&self) -> FaultKind {
        match self {
            JsonRejection::JsonDataError(e) => {
                let text = e.body_text();
                if text.contains("missing field") {
                    FaultKind::MissingField
                } else if text.contains("invalid type") {
                    FaultKind::InvalidType
                } else {
                    FaultKind::BadRequest
                }
            }
            // e.g. 413 when the body limit trips while buffering
            JsonRejection::BytesRejection(_) => FaultKind::from_status(self.status()),
            _ => FaultKind::BadRequest,
        }
    }

    fn fault_message(&self) -> String {
        scrub_rejected_values(&self.body_text())
    }
}

impl IntoFault for PathRejection {
    fn fault_kind(&self) -> FaultKind {
        match self {
            PathRejection::FailedToDeserializePathParams(_) => FaultKind::InvalidType,
            _ => FaultKind::Internal,
        }
    }

    fn fault_message(&self) -> String {
        self.body_text()
    }
}

impl IntoFault for serde_json::Error {
    fn fault_kind(&self) -> FaultKind {
        match self.classify() {
            serde_json::error::Category::Data => {
                if self.to_string().starts_with("missing field") {
                    FaultKind::MissingField
                } else {
                    FaultKind::InvalidType
                }
            }
            serde_json::error::Category::Io => FaultKind::Internal,
            _ => FaultKind::BadRequest,
        }
    }

    fn fault_message(&self) -> String {
        scrub_rejected_values(&self.to_string())
    }
}

/// Drop the offending input value from a deserialization message.
///
/// serde quotes the rejected value (``invalid type: integer `42`, expected
/// a string``); that value may be a secret, so only its kind is kept:
/// `invalid type: integer, expected a string`.
pub fn scrub_rejected_values(text: &str) -> String {
    const CLAUSES: [&str; 3] = ["invalid type: ", "invalid value: ", "unknown variant "];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((start, len)) = CLAUSES
        .iter()
        .filter_map(|clause| rest.find(clause).map(|i| (i, clause.len())))
        .min_by_key(|(i, _)| *i)
    {
        out.push_str(&rest[..start + len]);
        let tail = &rest[start + len..];
        let stop = tail.find(", expected").unwrap_or(tail.len());

        let skip = match tail[..stop].find(['`', '"']) {
            Some(open) => {
                let kind = tail[..open].trim_end();
                if kind.is_empty() {
                    out.truncate(out.trim_end().len());
                } else {
                    out.push_str(kind);
                }
                open + literal_len(&tail[open..])
            }
            None => {
                out.push_str(&tail[..stop]);
                stop
            }
        };
        rest = &tail[skip..];
    }
    out.push_str(rest);
    out
}

/// Byte length of a quoted literal starting at the first char of `s`,
/// including both delimiters. Unterminated literals run to the end.
fn literal_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    let Some((_, delimiter)) = chars.next() else {
        return 0;
    };
    let mut escaped = false;
    for (i, c) in chars {
        match c {
            '\\' if delimiter == '"' && !escaped => escaped = true,
            c if c == delimiter && !escaped => return i + c.len_utf8(),
            _ => escaped = false,
        }
    }
    s.len()
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// JSON body extractor whose rejection is a [`Fault`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Fault;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
