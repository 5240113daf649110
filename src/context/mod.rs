use crate::chain::ChainResult;
use crate::exception::HttpError;
use crate::routing::{ParamValue, PathParams};
use axum::body::Bytes;
use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;

/// The request as seen by context builders, middlewares, the auth gate and
/// route handlers.
///
/// A `Context` wraps the underlying HTTP request and carries the coerced path
/// parameters of the matched route. Values inserted by the application's
/// context builder or by middlewares ride in the request extensions and are
/// visible to every later link in the chain:
///
/// ```
/// use armature::{Context, CurrentUser};
///
/// # fn set(ctx: &mut Context) {
/// ctx.insert(CurrentUser { id: "42".into(), role: Some("ADMIN".into()) });
/// # }
/// # fn read(ctx: &Context) {
/// let user = ctx.get::<CurrentUser>();
/// # }
/// ```
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    pub(crate) fn new(request: Request) -> Self {
        Self {
            request,
            params: PathParams::default(),
        }
    }

    pub(crate) fn with_params(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// A header value as UTF-8, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    /// The coerced path parameters of the matched route.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Attach a value to the request, visible to all later chain links.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.request.extensions_mut().insert(value);
    }

    /// Read a value attached earlier in the chain.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.request.extensions().get::<T>()
    }

    /// Buffer and return the request body. Consumes the body; later reads
    /// see it empty.
    pub async fn body_bytes(&mut self) -> ChainResult<Bytes> {
        let body = std::mem::take(self.request.body_mut());
        let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
            Box::new(HttpError::with_status(
                format!("failed to read request body: {e}"),
                StatusCode::BAD_REQUEST,
            )) as crate::chain::ChainError
        })?;
        Ok(bytes)
    }

    /// Deserialize the request body as JSON. Malformed bodies answer 400.
    pub async fn body_json<T: DeserializeOwned>(&mut self) -> ChainResult<T> {
        let bytes = self.body_bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Box::new(HttpError::with_status(
                format!("invalid JSON body: {e}"),
                StatusCode::BAD_REQUEST,
            )) as crate::chain::ChainError
        })
    }

    pub(crate) fn into_request(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    fn request(body: &str) -> Request {
        Request::builder()
            .uri("/movies")
            .header("x-request-id", "r-1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn inserted_values_are_readable() {
        let mut ctx = Context::new(request(""));
        ctx.insert(7_u32);
        assert_eq!(ctx.get::<u32>(), Some(&7));
        assert_eq!(ctx.get::<String>(), None);
    }

    #[test]
    fn header_lookup() {
        let ctx = Context::new(request(""));
        assert_eq!(ctx.header("x-request-id"), Some("r-1"));
        assert_eq!(ctx.header("authorization"), None);
    }

    #[tokio::test]
    async fn body_json_deserializes() {
        #[derive(Deserialize)]
        struct Movie {
            title: String,
        }

        let mut ctx = Context::new(request(r#"{"title":"Heat"}"#));
        let movie: Movie = ctx.body_json().await.unwrap();
        assert_eq!(movie.title, "Heat");
    }

    #[tokio::test]
    async fn malformed_json_answers_bad_request() {
        let mut ctx = Context::new(request("not json"));
        let error = ctx.body_json::<serde_json::Value>().await.unwrap_err();
        let http = error.downcast_ref::<HttpError>().unwrap();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
    }
}
