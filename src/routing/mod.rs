use crate::auth::AuthSpec;
use crate::chain::{BoxedHandler, ChainResult, Middleware};
use crate::context::Context;
use axum::response::IntoResponse;
use axum::routing::MethodFilter;
use std::future::Future;
use std::sync::Arc;

mod pipes;

pub use pipes::{ParamPipe, ParamValue, PathParams, PipeKind};
pub(crate) use pipes::{coerce_params, detect_pipes, strip_pipes};

/// The HTTP verbs a route can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub(crate) fn filter(self) -> MethodFilter {
        match self {
            Self::Get => MethodFilter::GET,
            Self::Post => MethodFilter::POST,
            Self::Put => MethodFilter::PUT,
            Self::Delete => MethodFilter::DELETE,
        }
    }
}

/// One registered route: a verb, one or more path variants, the handler, and
/// the middlewares/auth it is composed with.
pub struct Route {
    pub(crate) method: Method,
    pub(crate) paths: Vec<String>,
    pub(crate) handler: BoxedHandler,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) auth: Option<AuthSpec>,
}

/// Per-route composition: middlewares run after the auth gate, in declared
/// order, then the handler.
#[derive(Default)]
pub struct RouteOptions {
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) auth: Option<AuthSpec>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn middlewares<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    pub fn auth(mut self, spec: AuthSpec) -> Self {
        self.auth = Some(spec);
        self
    }
}

/// One path pattern or a list of pattern variants for a single handler.
pub trait IntoPaths {
    fn into_paths(self) -> Vec<String>;
}

impl IntoPaths for &str {
    fn into_paths(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoPaths for String {
    fn into_paths(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoPaths for Vec<String> {
    fn into_paths(self) -> Vec<String> {
        self
    }
}

impl IntoPaths for Vec<&str> {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl<const N: usize> IntoPaths for [&str; N] {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

/// A controller's route table.
///
/// Built inside [`Controller::register`](crate::Controller::register) and
/// consumed exactly once when the controller is materialized. Paths may carry
/// typed parameter segments (`:year|number`); see [`PipeKind`].
///
/// ```
/// use armature::{AuthSpec, RouteOptions, Routes};
///
/// # fn build(routes: &mut Routes) {
/// routes
///     .get("/", |_ctx| async move { Ok("Welcome!") })
///     .get("/movie/:id", |ctx| async move {
///         let id = ctx.param("id").and_then(|p| p.as_str()).unwrap_or("").to_string();
///         Ok(format!("movie {id}"))
///     })
///     .post_with(
///         "/movie",
///         |_ctx| async move { Ok("created") },
///         RouteOptions::new().auth(AuthSpec::new()),
///     );
/// # }
/// ```
#[derive(Default)]
pub struct Routes {
    entries: Vec<Route>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<P, H, Fut, R>(&mut self, paths: P, handler: H) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Get, paths, handler, RouteOptions::new())
    }

    pub fn get_with<P, H, Fut, R>(&mut self, paths: P, handler: H, options: RouteOptions) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Get, paths, handler, options)
    }

    pub fn post<P, H, Fut, R>(&mut self, paths: P, handler: H) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Post, paths, handler, RouteOptions::new())
    }

    pub fn post_with<P, H, Fut, R>(&mut self, paths: P, handler: H, options: RouteOptions) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Post, paths, handler, options)
    }

    pub fn put<P, H, Fut, R>(&mut self, paths: P, handler: H) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Put, paths, handler, RouteOptions::new())
    }

    pub fn put_with<P, H, Fut, R>(&mut self, paths: P, handler: H, options: RouteOptions) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Put, paths, handler, options)
    }

    pub fn delete<P, H, Fut, R>(&mut self, paths: P, handler: H) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Delete, paths, handler, RouteOptions::new())
    }

    pub fn delete_with<P, H, Fut, R>(&mut self, paths: P, handler: H, options: RouteOptions) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Delete, paths, handler, options)
    }

    pub fn route<P, H, Fut, R>(
        &mut self,
        method: Method,
        paths: P,
        handler: H,
        options: RouteOptions,
    ) -> &mut Self
    where
        P: IntoPaths,
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<R>> + Send + 'static,
        R: IntoResponse,
    {
        let handler: BoxedHandler = Arc::new(move |ctx| {
            let fut = handler(ctx);
            Box::pin(async move { fut.await.map(IntoResponse::into_response) })
        });
        self.entries.push(Route {
            method,
            paths: paths.into_paths(),
            handler,
            middlewares: options.middlewares,
            auth: options.auth,
        });
        self
    }

    /// Drain the table. A second call returns nothing, so re-materializing a
    /// controller registers no additional routes.
    pub fn take_entries(&mut self) -> Vec<Route> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Prepend the leading slash a non-empty path is missing. Empty paths stay
/// empty.
pub(crate) fn slash(path: &str) -> String {
    let path = path.trim();
    if !path.is_empty() && !path.starts_with('/') {
        format!("/{path}")
    } else {
        path.to_string()
    }
}

/// Translate a pipe-stripped pattern into the underlying router's parameter
/// syntax (`:name` segments become `{name}`).
pub(crate) fn to_router_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_prepends_when_missing() {
        assert_eq!(slash("home"), "/home");
        assert_eq!(slash("/home"), "/home");
        assert_eq!(slash(" home "), "/home");
        assert_eq!(slash(""), "");
    }

    #[test]
    fn router_path_syntax() {
        assert_eq!(to_router_path("/movie/:id"), "/movie/{id}");
        assert_eq!(to_router_path("/a/:x/b/:y"), "/a/{x}/b/{y}");
        assert_eq!(to_router_path(""), "/");
        assert_eq!(to_router_path("/plain"), "/plain");
    }

    #[test]
    fn entries_keep_declaration_order() {
        let mut routes = Routes::new();
        routes
            .get("/a", |_ctx| async move { Ok("a") })
            .post("/b", |_ctx| async move { Ok("b") })
            .delete(["/c", "c2"], |_ctx| async move { Ok("c") });

        let entries = routes.take_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].method, Method::Get);
        assert_eq!(entries[1].method, Method::Post);
        assert_eq!(entries[2].method, Method::Delete);
        assert_eq!(entries[2].paths, vec!["/c".to_string(), "c2".to_string()]);
    }

    #[test]
    fn taking_entries_twice_yields_nothing() {
        let mut routes = Routes::new();
        routes.get("/a", |_ctx| async move { Ok("a") });

        assert_eq!(routes.take_entries().len(), 1);
        assert!(routes.take_entries().is_empty());
        assert!(routes.is_empty());
    }
}
