use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

mod handler;

pub use handler::{DefaultErrorHandler, ErrorHandler, ErrorHandlerOptions};

/// An error value carrying an HTTP status code and one or more payload items.
///
/// `HttpError` is what route handlers and middlewares return to answer a
/// request with a structured failure. It travels through the chain as a boxed
/// error and is recovered by downcast at the terminal error handler, which
/// turns it into a wire envelope.
///
/// # Example
/// ```
/// use armature::{HttpError, axum::http::StatusCode};
///
/// // default status is 400
/// let not_logged_in = HttpError::new("Login credentials are wrong");
/// let gone = HttpError::with_status("Movie not found", StatusCode::NOT_FOUND);
/// ```
///
/// Structured payloads work the same way, handy for per-field form errors:
/// ```
/// use armature::{HttpError, axum::http::StatusCode};
/// use serde_json::json;
///
/// let form = HttpError::from_values(
///     [json!({ "field": "email", "error": "Email is required" })],
///     StatusCode::BAD_REQUEST,
/// );
/// ```
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: StatusCode,
    pub errors: Vec<Value>,
}

impl HttpError {
    /// Single message, status 400.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(message, StatusCode::BAD_REQUEST)
    }

    pub fn with_status(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            status,
            errors: vec![Value::String(message.into())],
        }
    }

    /// Many messages at once. An empty list is replaced by a single generic
    /// message so the envelope never goes out empty.
    pub fn from_messages<I, S>(messages: I, status: StatusCode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let errors = messages
            .into_iter()
            .map(|m| Value::String(m.into()))
            .collect();
        Self::from_normalized(errors, status)
    }

    /// Arbitrary JSON payload items instead of plain messages.
    pub fn from_values<I>(values: I, status: StatusCode) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::from_normalized(values.into_iter().collect(), status)
    }

    /// One structured payload, serialized with serde.
    pub fn from_payload<P: Serialize>(payload: P, status: StatusCode) -> Self {
        let value = serde_json::to_value(payload)
            .unwrap_or_else(|e| Value::String(format!("unserializable error payload: {e}")));
        Self::from_normalized(vec![value], status)
    }

    fn from_normalized(mut errors: Vec<Value>, status: StatusCode) -> Self {
        if errors.is_empty() {
            errors.push(Value::String("Bad Request".to_string()));
        }
        Self { status, errors }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.status.as_u16())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match error.as_str() {
                Some(s) => write!(f, "{s}")?,
                None => write!(f, "{error}")?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_bad_request_with_single_message() {
        let error = HttpError::new("nope");
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.errors, vec![Value::String("nope".into())]);
    }

    #[test]
    fn keeps_explicit_status() {
        let error = HttpError::with_status("missing", StatusCode::NOT_FOUND);
        assert_eq!(error.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn normalizes_message_lists() {
        let error = HttpError::from_messages(["a", "b"], StatusCode::BAD_REQUEST);
        assert_eq!(error.errors.len(), 2);
    }

    #[test]
    fn empty_list_never_leaves_envelope_empty() {
        let error = HttpError::from_values([], StatusCode::BAD_REQUEST);
        assert_eq!(error.errors.len(), 1);
    }

    #[test]
    fn structured_payloads_survive() {
        let error = HttpError::from_values(
            [json!({ "field": "email", "error": "required" })],
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(error.errors[0]["field"], "email");
    }

    #[test]
    fn display_joins_messages() {
        let error = HttpError::from_messages(["a", "b"], StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "400: a, b");
    }
}
