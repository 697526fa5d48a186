//! Typed error taxonomy for the service API.
//!
//! Every failure surfaced by the HTTP core is an [`ApiError`] whose
//! [`ErrorKind`] can be matched exhaustively. HTTP responses are classified
//! by status; transport failures (DNS, refused connections, timeouts,
//! cancellation) become [`ErrorKind::Network`] with no status.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use serde_json::Value;
use thiserror::Error;

pub const AUTH_ERROR: &str = "AUTH_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const CONFLICT: &str = "CONFLICT";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const GENERIC_ERROR: &str = "GENERIC_ERROR";

/// Code used when a success payload cannot be decoded.
pub const DECODE_ERROR: &str = "DECODE_ERROR";
/// Code used for rejected client configuration.
pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
/// Code used for rejected call arguments.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

/// Field name → messages, as reported by a 400 response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Discriminant of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 401 or 403.
    Authentication,
    /// HTTP 404.
    NotFound,
    /// HTTP 400.
    Validation,
    /// HTTP 409.
    Conflict,
    /// Transport failure, or a non-2xx status with no dedicated kind.
    Network,
    /// Anything else, tagged with a caller-supplied code.
    Generic(String),
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    pub fn code(&self) -> &str {
        match self {
            ErrorKind::Authentication => AUTH_ERROR,
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::Validation => VALIDATION_ERROR,
            ErrorKind::Conflict => CONFLICT,
            ErrorKind::Network => NETWORK_ERROR,
            ErrorKind::Generic(code) => code,
        }
    }
}

/// Which kind of transport failure produced a [`ErrorKind::Network`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Failed,
    TimedOut,
    Cancelled,
}

/// A classified failure from the service API.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    data: Option<Value>,
    field_errors: Option<FieldErrors>,
    transport: Option<Transport>,
    source: Option<BoxError>,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            data: None,
            field_errors: None,
            transport: None,
            source: None,
        }
    }

    /// Creates a generic error with a caller-assigned code.
    ///
    /// An empty code is replaced with [`GENERIC_ERROR`] so that every error
    /// carries a non-empty code.
    pub fn generic(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut code = code.into();
        if code.is_empty() {
            code = GENERIC_ERROR.to_string();
        }
        Self::new(ErrorKind::Generic(code), message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// A low-level transport failure wrapping its cause.
    pub fn network<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut err = Self::new(ErrorKind::Network, message);
        err.transport = Some(Transport::Failed);
        err.source = Some(Box::new(cause));
        err
    }

    /// The attempt did not complete within its timeout.
    pub fn timed_out() -> Self {
        let mut err = Self::new(ErrorKind::Network, "request timed out");
        err.transport = Some(Transport::TimedOut);
        err
    }

    /// The caller's cancellation token fired.
    pub fn cancelled() -> Self {
        let mut err = Self::new(ErrorKind::Network, "request cancelled");
        err.transport = Some(Transport::Cancelled);
        err
    }

    /// Classifies a non-2xx response.
    ///
    /// `body` is the raw response text; it is decoded as JSON when possible
    /// and kept as `data`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let data = decode_body(body);
        let message = extract_message(data.as_ref()).unwrap_or_else(|| format!("HTTP {status}"));

        let mut err = match status {
            401 | 403 => Self::authentication(message),
            404 => Self::not_found(message),
            409 => Self::conflict(message),
            400 => {
                let mut err = Self::validation(message);
                err.field_errors = data.as_ref().and_then(extract_field_errors);
                err
            }
            _ => Self::new(ErrorKind::Network, message),
        };
        err.status = Some(status);
        err.data = data;
        err
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_field_errors(mut self, field_errors: FieldErrors) -> Self {
        self.field_errors = Some(field_errors);
        self
    }

    pub fn with_source<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn code(&self) -> &str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Decoded response body, if the server sent one.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        self.field_errors.as_ref()
    }

    /// True for failures below HTTP: no response was received.
    pub fn is_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_timeout(&self) -> bool {
        self.transport == Some(Transport::TimedOut)
    }

    pub fn is_cancelled(&self) -> bool {
        self.transport == Some(Transport::Cancelled)
    }
}

fn decode_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}

/// Picks the human message out of an error payload: `msg`, then `message`,
/// then `error`.
fn extract_message(data: Option<&Value>) -> Option<String> {
    let object = data?.as_object()?;
    ["msg", "message", "error"].iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Reads a `{ field: "msg" | ["msg", ...] }` map under `errors` or
/// `fieldErrors`.
fn extract_field_errors(data: &Value) -> Option<FieldErrors> {
    let map = ["errors", "fieldErrors"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_object))?;

    let mut field_errors = FieldErrors::new();
    for (field, value) in map {
        let messages: Vec<String> = match value {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => continue,
        };
        if !messages.is_empty() {
            field_errors.insert(field.clone(), messages);
        }
    }

    if field_errors.is_empty() {
        None
    } else {
        Some(field_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_statuses() {
        for status in [401, 403] {
            let err = ApiError::from_response(status, "");
            assert_eq!(err.kind(), &ErrorKind::Authentication);
            assert_eq!(err.status(), Some(status));
            assert_eq!(err.code(), AUTH_ERROR);
            assert_eq!(err.message(), format!("HTTP {}", status));
        }
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::from_response(404, r#"{"msg": "Table not found"}"#);
        assert_eq!(err.kind(), &ErrorKind::NotFound);
        assert_eq!(err.code(), NOT_FOUND);
        assert_eq!(err.message(), "Table not found");
    }

    #[test]
    fn test_conflict_keeps_full_body() {
        let body = json!({"message": "duplicate", "id": 7});
        let err = ApiError::from_response(409, &body.to_string());
        assert_eq!(err.kind(), &ErrorKind::Conflict);
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.data(), Some(&body));
    }

    #[test]
    fn test_validation_message_priority() {
        let err = ApiError::from_response(
            400,
            r#"{"error": "third", "message": "second", "msg": "first"}"#,
        );
        assert_eq!(err.message(), "first");

        let err = ApiError::from_response(400, r#"{"error": "third", "message": "second"}"#);
        assert_eq!(err.message(), "second");

        let err = ApiError::from_response(400, r#"{"error": "third"}"#);
        assert_eq!(err.message(), "third");
        assert_eq!(err.kind(), &ErrorKind::Validation);
        assert_eq!(err.code(), VALIDATION_ERROR);
    }

    #[test]
    fn test_validation_field_errors() {
        let err = ApiError::from_response(
            400,
            r#"{"msg": "invalid", "errors": {"title": "required", "age": ["too small", "not int"]}}"#,
        );
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["title"], vec!["required"]);
        assert_eq!(fields["age"], vec!["too small", "not int"]);

        let err = ApiError::from_response(400, r#"{"msg": "invalid"}"#);
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_other_status_is_network() {
        let err = ApiError::from_response(502, "Bad Gateway");
        assert_eq!(err.kind(), &ErrorKind::Network);
        assert_eq!(err.code(), NETWORK_ERROR);
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.message(), "HTTP 502");
        assert_eq!(err.data(), Some(&json!("Bad Gateway")));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ApiError::network("connection failed", io);
        assert_eq!(err.kind(), &ErrorKind::Network);
        assert!(err.is_transport());
        assert!(err.status().is_none());
        assert!(std::error::Error::source(&err).is_some());

        let timeout = ApiError::timed_out();
        let cancel = ApiError::cancelled();
        assert!(timeout.is_timeout() && !timeout.is_cancelled());
        assert!(cancel.is_cancelled() && !cancel.is_timeout());
        assert_ne!(timeout.message(), cancel.message());
        assert_eq!(timeout.code(), cancel.code());
    }

    #[test]
    fn test_generic_code() {
        let err = ApiError::generic("CUSTOM", "boom");
        assert_eq!(err.code(), "CUSTOM");
        assert_eq!(err.to_string(), "boom");

        let err = ApiError::generic("", "boom");
        assert_eq!(err.code(), GENERIC_ERROR);
    }

    #[test]
    fn test_codes_are_stable_per_kind() {
        let a = ApiError::from_response(404, "");
        let b = ApiError::not_found("other");
        assert_eq!(a.code(), b.code());
    }
}
