use axum::http::StatusCode;

/// Closed set of fault categories and their HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Validation,
    BadRequest,
    MissingField,
    InvalidType,
    Unauthenticated,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    Conflict,
    PayloadTooLarge,
    UnsupportedMediaType,
    Integrity,
    Database,
    Internal,
}

impl FaultKind {
    pub fn status(&self) -> StatusCode {
        match self {
            FaultKind::Validation
            | FaultKind::BadRequest
            | FaultKind::MissingField
            | FaultKind::InvalidType => StatusCode::BAD_REQUEST,
            FaultKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            FaultKind::Forbidden => StatusCode::FORBIDDEN,
            FaultKind::NotFound => StatusCode::NOT_FOUND,
            FaultKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            FaultKind::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            FaultKind::Conflict => StatusCode::CONFLICT,
            FaultKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            FaultKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            FaultKind::Integrity => StatusCode::UNPROCESSABLE_ENTITY,
            FaultKind::Database | FaultKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `type` string of the error envelope.
    pub fn type_name(&self) -> &'static str {
        match self {
            FaultKind::Validation => "Validation Error",
            FaultKind::BadRequest => "Bad Request",
            FaultKind::MissingField => "Missing Required Field",
            FaultKind::InvalidType => "Invalid Data Type",
            FaultKind::Unauthenticated => "Authentication Error",
            FaultKind::Forbidden => "Authorization Error",
            FaultKind::NotFound => "Not Found",
            FaultKind::MethodNotAllowed => "Method Not Allowed",
            FaultKind::RequestTimeout => "Request Timeout",
            FaultKind::Conflict => "Conflict",
            FaultKind::PayloadTooLarge => "Payload Too Large",
            FaultKind::UnsupportedMediaType => "Unsupported Media Type",
            FaultKind::Integrity => "Integrity Error",
            FaultKind::Database => "Database Error",
            FaultKind::Internal => "Internal Server Error",
        }
    }

    /// Classify an error status produced outside the handlers, e.g. by a
    /// timeout or body-limit layer. Unlisted codes fall back to
    /// `BadRequest` (4xx) or `Internal` (5xx).
    pub fn from_status(status: StatusCode) -> FaultKind {
        match status {
            StatusCode::UNAUTHORIZED => FaultKind::Unauthenticated,
            StatusCode::FORBIDDEN => FaultKind::Forbidden,
            StatusCode::NOT_FOUND => FaultKind::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => FaultKind::MethodNotAllowed,
            StatusCode::REQUEST_TIMEOUT => FaultKind::RequestTimeout,
            StatusCode::CONFLICT => FaultKind::Conflict,
            StatusCode::PAYLOAD_TOO_LARGE => FaultKind::PayloadTooLarge,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => FaultKind::UnsupportedMediaType,
            StatusCode::UNPROCESSABLE_ENTITY => FaultKind::Integrity,
            s if s.is_server_error() => FaultKind::Internal,
            _ => FaultKind::BadRequest,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Name used as the error type in log records when no source error
    /// type is known.
    pub fn variant_name(&self) -> &'static str {
        match self {
            FaultKind::Validation => "Validation",
            FaultKind::BadRequest => "BadRequest",
            FaultKind::MissingField => "MissingField",
            FaultKind::InvalidType => "InvalidType",
            FaultKind::Unauthenticated => "Unauthenticated",
            FaultKind::Forbidden => "Forbidden",
            FaultKind::NotFound => "NotFound",
            FaultKind::MethodNotAllowed => "MethodNotAllowed",
            FaultKind::RequestTimeout => "RequestTimeout",
            FaultKind::Conflict => "Conflict",
            FaultKind::PayloadTooLarge => "PayloadTooLarge",
            FaultKind::UnsupportedMediaType => "UnsupportedMediaType",
            FaultKind::Integrity => "Integrity",
            FaultKind::Database => "Database",
            FaultKind::Internal => "Internal",
        }
    }
}
