use crate::auth::AuthGate;
use crate::chain::{Chain, ChainResult};
use crate::context::Context;
use crate::exception::ErrorHandler;
use crate::routing::{
    ParamPipe, Route, Routes, coerce_params, detect_pipes, slash, strip_pipes, to_router_path,
};
use axum::Router;
use axum::extract::{RawPathParams, Request};
use axum::response::Response;
use axum::routing::on;
use std::sync::Arc;

/// A group of routes mounted together under one path.
///
/// Implementors build their route table in [`register`](Controller::register);
/// the app composer resolves the controller through the injector, then
/// materializes it into a sub-router.
///
/// ```
/// use armature::{Controller, Routes};
/// use std::sync::Arc;
/// # struct MovieService;
/// # impl MovieService { async fn title(&self) -> String { String::new() } }
///
/// struct HomeController {
///     movies: Arc<MovieService>,
/// }
///
/// impl Controller for HomeController {
///     fn path(&self) -> String {
///         "home".to_string()
///     }
///
///     fn register(self: Arc<Self>, routes: &mut Routes) {
///         let this = self.clone();
///         routes.get("/", move |_ctx| {
///             let this = this.clone();
///             async move { Ok(this.movies.title().await) }
///         });
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Mount path of this controller's sub-router, slash-normalized at
    /// mount time. Defaults to the root.
    fn path(&self) -> String {
        String::new()
    }

    /// Build the route table. Called once, when the controller is
    /// materialized.
    fn register(self: Arc<Self>, routes: &mut Routes);
}

/// A materialized controller: the mount path plus a ready sub-router with
/// every declared route attached.
pub struct MountedController {
    pub path: String,
    pub router: Router,
}

impl MountedController {
    /// Turn a constructed controller into a sub-router.
    ///
    /// The route table is drained in the process; a controller with no
    /// declared routes yields an empty sub-router.
    pub fn materialize(
        controller: Arc<dyn Controller>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        let path = controller.path();
        let mut routes = Routes::new();
        Arc::clone(&controller).register(&mut routes);

        let mut router = Router::new();
        for route in routes.take_entries() {
            router = attach(router, route, error_handler.clone());
        }

        Self { path, router }
    }
}

struct RouteRuntime {
    pipes: Vec<ParamPipe>,
    gate: Option<AuthGate>,
    chain: Chain,
    error_handler: Arc<dyn ErrorHandler>,
}

impl RouteRuntime {
    async fn dispatch(&self, params: RawPathParams, request: Request) -> Response {
        let params = coerce_params(params.iter(), &self.pipes);
        let ctx = Context::with_params(request, params);
        match self.run(ctx).await {
            Ok(response) => response,
            Err(error) => self.error_handler.handle(error),
        }
    }

    async fn run(&self, ctx: Context) -> ChainResult<Response> {
        // the gate runs before any middleware attached to this handler
        if let Some(gate) = &self.gate {
            gate.check(&ctx)?;
        }
        self.chain.run(ctx).await
    }
}

fn attach(mut router: Router, route: Route, error_handler: Arc<dyn ErrorHandler>) -> Router {
    let normalized: Vec<String> = route.paths.iter().map(|path| slash(path)).collect();

    // one handler can have several path variants; the pipe set applied at
    // dispatch is the union across all of them
    let mut pipes: Vec<ParamPipe> = Vec::new();
    for path in &normalized {
        for pipe in detect_pipes(path) {
            if !pipes.iter().any(|seen| seen.name == pipe.name) {
                pipes.push(pipe);
            }
        }
    }

    let runtime = Arc::new(RouteRuntime {
        pipes,
        gate: route.auth.map(AuthGate::new),
        chain: Chain::new(route.middlewares, route.handler),
        error_handler,
    });

    for path in &normalized {
        let router_path = to_router_path(&strip_pipes(path));
        let runtime = runtime.clone();
        let handler = move |params: RawPathParams, request: Request| {
            let runtime = runtime.clone();
            async move { runtime.dispatch(params, request).await }
        };
        router = router.route(&router_path, on(route.method.filter(), handler));
    }
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSpec;
    use crate::chain::{self, Flow};
    use crate::exception::{DefaultErrorHandler, HttpError};
    use crate::routing::RouteOptions;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn handler() -> Arc<dyn ErrorHandler> {
        Arc::new(DefaultErrorHandler::new())
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(HttpRequest::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    struct EmptyController;

    impl Controller for EmptyController {
        fn register(self: Arc<Self>, _routes: &mut Routes) {}
    }

    #[tokio::test]
    async fn zero_route_controllers_materialize_to_an_empty_router() {
        let mounted = MountedController::materialize(Arc::new(EmptyController), handler());
        assert_eq!(mounted.path, "");
        let (status, _) = get(mounted.router, "/anything").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    struct HomeController;

    impl Controller for HomeController {
        fn path(&self) -> String {
            "home".to_string()
        }

        fn register(self: Arc<Self>, routes: &mut Routes) {
            routes
                .get("/", |_ctx| async move { Ok("Welcome!") })
                // missing leading slash is tolerated
                .get("movie/:id", |ctx| async move {
                    let id = ctx
                        .param("id")
                        .and_then(|p| p.as_str())
                        .unwrap_or_default()
                        .to_string();
                    Ok(format!("movie {id}"))
                })
                .get(
                    "/movies/:year|number/r-rated/:rated|boolean",
                    |ctx| async move {
                        let year = ctx.param("year").and_then(|p| p.as_number()).unwrap();
                        if year.is_nan() {
                            return Err(Box::new(HttpError::from_payload(
                                serde_json::json!({ "field": "year", "error": "Invalid Year" }),
                                StatusCode::BAD_REQUEST,
                            )) as chain::ChainError);
                        }
                        let rated = ctx.param("rated").and_then(|p| p.as_bool()).unwrap();
                        Ok(format!("{year} {rated}"))
                    },
                );
        }
    }

    #[tokio::test]
    async fn routes_are_registered_under_their_normalized_paths() {
        let mounted = MountedController::materialize(Arc::new(HomeController), handler());
        assert_eq!(mounted.path, "home");

        let (status, body) = get(mounted.router.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Welcome!");

        let (status, body) = get(mounted.router, "/movie/97").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "movie 97");
    }

    #[tokio::test]
    async fn typed_params_are_coerced_before_the_handler_runs() {
        let mounted = MountedController::materialize(Arc::new(HomeController), handler());

        let (status, body) = get(mounted.router.clone(), "/movies/1997/r-rated/true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1997 true");

        // only the literal "true" is true
        let (_, body) = get(mounted.router.clone(), "/movies/1997/r-rated/TRUE").await;
        assert_eq!(body, "1997 false");

        // a non-numeric year reaches the handler as NaN
        let (status, body) = get(mounted.router, "/movies/abc/r-rated/true").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid Year"));
    }

    struct VariantController;

    impl Controller for VariantController {
        fn register(self: Arc<Self>, routes: &mut Routes) {
            routes.get(["/films/:id|number", "/movies/:id"], |ctx| async move {
                let id = ctx.param("id").and_then(|p| p.as_number()).unwrap();
                Ok(format!("{id}"))
            });
        }
    }

    #[tokio::test]
    async fn path_variants_share_one_handler_and_their_pipes() {
        let mounted = MountedController::materialize(Arc::new(VariantController), handler());

        let (_, body) = get(mounted.router.clone(), "/films/7").await;
        assert_eq!(body, "7");
        // the sibling variant declares no pipe but still coerces
        let (_, body) = get(mounted.router, "/movies/9").await;
        assert_eq!(body, "9");
    }

    struct GuardedController {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Controller for GuardedController {
        fn register(self: Arc<Self>, routes: &mut Routes) {
            let log = self.log.clone();
            let mw = chain::from_fn(move |ctx| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push("middleware");
                    Ok(Flow::Continue(ctx))
                }
            });
            let log = self.log.clone();
            routes.get_with(
                "/secret",
                move |_ctx| {
                    let log = log.clone();
                    async move {
                        log.lock().unwrap().push("handler");
                        Ok("classified")
                    }
                },
                RouteOptions::new()
                    .middleware(mw)
                    .auth(AuthSpec::role("ADMIN")),
            );
        }
    }

    #[tokio::test]
    async fn the_gate_rejects_before_any_middleware_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mounted = MountedController::materialize(
            Arc::new(GuardedController { log: log.clone() }),
            handler(),
        );

        let (status, body) = get(mounted.router, "/secret").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("errors"));
        assert!(log.lock().unwrap().is_empty());
    }
}
