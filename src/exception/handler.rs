use crate::chain::ChainError;
use crate::config::production;
use crate::exception::HttpError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;

/// The terminal boundary of a request: converts a funneled error into the
/// response the client sees. Installed once per application, after all routes.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: ChainError) -> Response;
}

type OnError = Arc<dyn Fn(&(dyn std::error::Error + Send + Sync)) + Send + Sync>;

/// Knobs for [`DefaultErrorHandler`].
#[derive(Clone)]
pub struct ErrorHandlerOptions {
    /// Key of the error array in the wire envelope.
    pub error_key: String,
    /// Message sent for errors that are not [`HttpError`].
    pub server_error_message: String,
    /// Status sent for errors that are not [`HttpError`].
    pub server_error_status: StatusCode,
    /// Called for errors that are not [`HttpError`], for logging or
    /// reporting. When unset, the error is logged via tracing outside
    /// production.
    pub on_error: Option<OnError>,
}

impl Default for ErrorHandlerOptions {
    fn default() -> Self {
        Self {
            error_key: "errors".to_string(),
            server_error_message: "Something went wrong, Please try again.".to_string(),
            server_error_status: StatusCode::INTERNAL_SERVER_ERROR,
            on_error: None,
        }
    }
}

/// Default terminal error handler.
///
/// An [`HttpError`] is answered verbatim: its status code and
/// `{ "<errorKey>": [...] }`. Anything else is reported through
/// [`ErrorHandlerOptions::on_error`] and answered with the configured server
/// error, so internal detail never leaks to the client.
#[derive(Default)]
pub struct DefaultErrorHandler {
    options: ErrorHandlerOptions,
}

impl DefaultErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ErrorHandlerOptions) -> Self {
        Self { options }
    }

    fn envelope(&self, status: StatusCode, errors: Vec<Value>) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.options.error_key.clone(), Value::Array(errors));
        (status, Json(Value::Object(body))).into_response()
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: ChainError) -> Response {
        if let Some(http) = error.downcast_ref::<HttpError>() {
            return self.envelope(http.status, http.errors.clone());
        }

        match &self.options.on_error {
            Some(hook) => hook(error.as_ref()),
            None => {
                if !production() {
                    tracing::error!(error = %error, "unhandled error while serving request");
                }
            }
        }

        self.envelope(
            self.options.server_error_status,
            vec![Value::String(self.options.server_error_message.clone())],
        )
    }
}
