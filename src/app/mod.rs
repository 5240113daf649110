use crate::chain::{ChainResult, Middleware};
use crate::config::ConfigService;
use crate::context::Context;
use crate::controller::{Controller, MountedController};
use crate::di::{ControllerRef, Injector};
use crate::error::{ArmatureError, Result};
use crate::exception::{DefaultErrorHandler, ErrorHandler};
use crate::routing::slash;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::services::ServeDir;

mod layer;
mod shutdown;

use layer::{BoundaryLayer, BoundaryState, ContextBuilderFn};
pub use shutdown::shutdown_signal;

const DEFAULT_PORT: &str = "5000";

/// Composes controllers, global middleware, static assets and the terminal
/// error handler onto one server.
///
/// ```no_run
/// use armature::{App, Injector, Provider};
/// # use armature::{Controller, Routes};
/// # use std::sync::Arc;
/// # struct HomeController;
/// # impl Controller for HomeController {
/// #     fn register(self: Arc<Self>, _routes: &mut Routes) {}
/// # }
///
/// #[tokio::main]
/// async fn main() -> armature::Result<()> {
///     let mut injector = Injector::new();
///     injector.provide_controller(Provider::new(|_| Ok(HomeController)));
///
///     let app = App::builder()
///         .prefix("/api")
///         .controller::<HomeController>()
///         .build(&injector)?;
///
///     app.listen().await
/// }
/// ```
#[derive(Debug)]
pub struct App {
    router: Router,
    port: u16,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// The assembled router, mainly useful for driving the app in tests
    /// without binding a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind the configured port and serve until a shutdown signal arrives.
    /// Logs a ready line once the socket is bound.
    pub async fn listen(self) -> Result<()> {
        self.serve(false).await
    }

    /// Like [`listen`](App::listen), without the ready line.
    pub async fn listen_silent(self) -> Result<()> {
        self.serve(true).await
    }

    async fn serve(self, silent: bool) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;
        if !silent {
            tracing::info!("🚀 ready at http://localhost:{}", self.port);
        }
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Configuration surface of [`App`].
pub struct AppBuilder {
    controllers: Vec<ControllerRef>,
    port: Option<String>,
    middlewares: Vec<Arc<dyn Middleware>>,
    prefix: String,
    assets_path: String,
    assets_dir: String,
    error_handler: Arc<dyn ErrorHandler>,
    context: Option<ContextBuilderFn>,
}

impl AppBuilder {
    fn new() -> Self {
        Self {
            controllers: Vec::new(),
            port: None,
            middlewares: Vec::new(),
            prefix: String::new(),
            assets_path: String::new(),
            assets_dir: "public".to_string(),
            error_handler: Arc::new(DefaultErrorHandler::new()),
            context: None,
        }
    }

    /// Append a controller. Controllers are resolved through the injector
    /// and mounted in declaration order.
    pub fn controller<C: Controller + 'static>(mut self) -> Self {
        self.controllers.push(ControllerRef::of::<C>());
        self
    }

    /// The port to listen on. Accepts anything stringly (environment values
    /// included); a non-numeric value fails at build time. Falls back to the
    /// `PORT` environment variable, then to 5000.
    pub fn port(mut self, port: impl ToString) -> Self {
        self.port = Some(port.to_string());
        self
    }

    /// Append a global middleware. Globals run on every request, after the
    /// context-injection step and before any route.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// App-level path prefix, e.g. `/api`: every mounted controller gets it
    /// prepended.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Serve static assets at this mount path. The prefix does not apply.
    /// Nothing is served until a mount path is configured.
    pub fn assets(mut self, mount_path: impl Into<String>) -> Self {
        self.assets_path = mount_path.into();
        self
    }

    /// Local directory the assets are read from. Defaults to `public`.
    pub fn assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    /// Replace the terminal error handler.
    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Per-request context builder, awaited before anything else runs.
    /// The conventional place to authenticate the caller and attach a
    /// [`CurrentUser`](crate::CurrentUser).
    pub fn context<F, Fut>(mut self, builder: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChainResult<Context>> + Send + 'static,
    {
        self.context = Some(Arc::new(move |ctx| Box::pin(builder(ctx))));
        self
    }

    /// Resolve and mount every controller, then assemble the final router.
    ///
    /// Fails fast on a non-numeric port, on an unresolvable controller, and
    /// on a controllers entry that was not registered via
    /// [`provide_controller`](Injector::provide_controller); the error names
    /// the offending entry's position.
    pub fn build(self, injector: &Injector) -> Result<App> {
        let port = self
            .port
            .clone()
            .or_else(|| ConfigService::new().get("PORT"))
            .unwrap_or_else(|| DEFAULT_PORT.to_string());
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ArmatureError::InvalidPort { value: port })?;

        let mut router = Router::new();

        for (index, reference) in self.controllers.iter().enumerate() {
            let controller = injector.resolve_controller(reference).map_err(|source| {
                ArmatureError::ControllerResolution {
                    position: index + 1,
                    source: Box::new(source),
                }
            })?;
            let mounted = MountedController::materialize(controller, self.error_handler.clone());
            let mount = format!("{}{}", self.prefix, slash(&mounted.path));
            router = if mount.is_empty() || mount == "/" {
                router.merge(mounted.router)
            } else {
                router.nest(&mount, mounted.router)
            };
        }

        if !self.assets_path.is_empty() {
            router = router.nest_service(&slash(&self.assets_path), ServeDir::new(&self.assets_dir));
        }

        let router = router.layer(BoundaryLayer::new(BoundaryState {
            context: self.context,
            middlewares: self.middlewares,
            error_handler: self.error_handler,
        }));

        Ok(App { router, port })
    }
}
