//! # Armature
//!
//! A lightweight web framework over axum: explicit route tables, middleware
//! chains with a single error funnel, role-based auth gates, a uniform error
//! envelope, and a small dependency injector with cycle detection.
//!
//! ## Features
//!
//! - **Controllers**: group routes under a mount path, resolved through the
//!   injector and materialized into axum sub-routers
//! - **Typed path parameters**: `:year|number` pipe segments coerce params
//!   before the handler runs
//! - **Middleware chains**: strictly ordered, short-circuiting, every error
//!   funneled exactly once to the terminal error handler
//! - **Auth gate**: authentication and role checks that run before any
//!   middleware attached to the handler
//! - **Dependency injection**: providers with explicit dependency lists,
//!   resolved bottom-up, cycles rejected before anything is constructed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use armature::{App, AuthSpec, Controller, Deps, HttpError, Injector, Provider, RouteOptions, Routes};
//! use armature::axum::http::StatusCode;
//! use std::sync::Arc;
//!
//! // 1. Define your service
//! struct MovieService;
//!
//! impl MovieService {
//!     fn find(&self, _id: &str) -> Option<String> {
//!         None
//!     }
//! }
//!
//! // 2. Define your controller
//! struct HomeController {
//!     movies: Arc<MovieService>,
//! }
//!
//! impl Controller for HomeController {
//!     fn path(&self) -> String {
//!         "home".to_string()
//!     }
//!
//!     fn register(self: Arc<Self>, routes: &mut Routes) {
//!         let this = self.clone();
//!         routes
//!             .get("/", |_ctx| async move { Ok("Welcome!") })
//!             .get("/movie/:id", move |ctx| {
//!                 let this = this.clone();
//!                 async move {
//!                     let id = ctx.param("id").and_then(|p| p.as_str()).unwrap_or_default();
//!                     match this.movies.find(id) {
//!                         Some(title) => Ok(title),
//!                         None => Err(Box::new(HttpError::with_status(
//!                             "Movie not found",
//!                             StatusCode::NOT_FOUND,
//!                         )) as armature::ChainError),
//!                     }
//!                 }
//!             })
//!             .post_with(
//!                 "/movie",
//!                 |_ctx| async move { Ok("created") },
//!                 RouteOptions::new().auth(AuthSpec::new()),
//!             );
//!     }
//! }
//!
//! // 3. Wire and serve
//! #[tokio::main]
//! async fn main() -> armature::Result<()> {
//!     let mut injector = Injector::new();
//!     injector.provide(Provider::new(|_| Ok(MovieService)));
//!     injector.provide_controller(
//!         Provider::new(|deps: &Deps| Ok(HomeController { movies: deps.get::<MovieService>()? }))
//!             .depends_on::<MovieService>(),
//!     );
//!
//!     App::builder()
//!         .prefix("/api")
//!         .controller::<HomeController>()
//!         .build(&injector)?
//!         .listen()
//!         .await
//! }
//! ```

pub mod app;
pub mod auth;
pub mod chain;
pub mod config;
pub mod context;
pub mod controller;
pub mod di;
pub mod error;
pub mod exception;
pub mod routing;

// Re-export core types
pub use app::{App, AppBuilder, shutdown_signal};
pub use auth::{AuthExtension, AuthFailure, AuthSpec, CurrentUser};
pub use chain::{BoxedHandler, Chain, ChainError, ChainResult, Flow, Middleware};
pub use config::{ConfigService, production};
pub use context::Context;
pub use controller::{Controller, MountedController};
pub use di::{ControllerRef, Deps, Injector, Provider};
pub use error::{ArmatureError, Result};
pub use exception::{DefaultErrorHandler, ErrorHandler, ErrorHandlerOptions, HttpError};
pub use routing::{Method, ParamValue, PathParams, PipeKind, RouteOptions, Routes};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use armature::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{App, AppBuilder, shutdown_signal};
    pub use crate::auth::{AuthExtension, AuthFailure, AuthSpec, CurrentUser};
    pub use crate::chain::{self, Chain, ChainError, ChainResult, Flow, Middleware};
    pub use crate::config::{ConfigService, production};
    pub use crate::context::Context;
    pub use crate::controller::{Controller, MountedController};
    pub use crate::di::{ControllerRef, Deps, Injector, Provider};
    pub use crate::error::{ArmatureError, Result};
    pub use crate::exception::{DefaultErrorHandler, ErrorHandler, ErrorHandlerOptions, HttpError};
    pub use crate::routing::{Method, ParamValue, PathParams, PipeKind, RouteOptions, Routes};
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
