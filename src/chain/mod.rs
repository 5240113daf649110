use crate::config::production;
use crate::context::Context;
use async_trait::async_trait;
use axum::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A type-erased error travelling through a request chain.
pub type ChainError = Box<dyn std::error::Error + Send + Sync>;

pub type ChainResult<T> = Result<T, ChainError>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = ChainResult<Response>> + Send>>;

/// A route's terminal handler, boxed for storage in the route table.
pub type BoxedHandler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync>;

/// The outcome a middleware hands back to the chain.
///
/// A link must return [`Flow::Continue`] for the chain to proceed. Returning
/// `Err` funnels the error to the terminal error handler; [`Flow::Fail`] does
/// the same but marks the error as "passed to the continuation" (the shape is
/// accepted for compatibility, with an advisory logged outside production).
pub enum Flow {
    /// Proceed to the next link (or the terminal handler).
    Continue(Context),
    /// End the request with this response; no further link runs.
    Halt(Response),
    /// Equivalent to returning `Err`, advisory logged first.
    Fail(ChainError),
}

/// A function that runs before a route handler and may short-circuit or
/// continue the chain.
///
/// # Example
/// ```
/// use armature::{async_trait, ChainResult, Context, Flow, Middleware};
///
/// struct RequestLog;
///
/// #[async_trait]
/// impl Middleware for RequestLog {
///     async fn handle(&self, ctx: Context) -> ChainResult<Flow> {
///         tracing::info!(path = ctx.path(), "inbound");
///         Ok(Flow::Continue(ctx))
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: Context) -> ChainResult<Flow>;
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = ChainResult<Flow>> + Send>>;

struct FnMiddleware {
    f: Box<dyn Fn(Context) -> MiddlewareFuture + Send + Sync>,
}

#[async_trait]
impl Middleware for FnMiddleware {
    async fn handle(&self, ctx: Context) -> ChainResult<Flow> {
        (self.f)(ctx).await
    }
}

/// Adapt an async closure into a [`Middleware`].
///
/// ```
/// use armature::{chain, Flow};
///
/// let log = chain::from_fn(|ctx| async move {
///     tracing::info!("::: inside log");
///     Ok(Flow::Continue(ctx))
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ChainResult<Flow>> + Send + 'static,
{
    Arc::new(FnMiddleware {
        f: Box::new(move |ctx| Box::pin(f(ctx))),
    })
}

/// An ordered middleware list composed with a terminal handler.
///
/// Execution is strictly sequential and short-circuiting: each link either
/// continues, halts with a response, or fails. Exactly one error reaches the
/// boundary for any failing request; an empty list degrades to the terminal
/// handler alone, under the same discipline.
pub struct Chain {
    links: Vec<Arc<dyn Middleware>>,
    terminal: BoxedHandler,
}

impl Chain {
    pub fn new(links: Vec<Arc<dyn Middleware>>, terminal: BoxedHandler) -> Self {
        Self { links, terminal }
    }

    pub async fn run(&self, ctx: Context) -> ChainResult<Response> {
        Self::execute(&self.links, ctx, |ctx| (self.terminal)(ctx)).await
    }

    /// Drive `links` in order, then `terminal`.
    pub async fn execute<F, Fut>(
        links: &[Arc<dyn Middleware>],
        mut ctx: Context,
        terminal: F,
    ) -> ChainResult<Response>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = ChainResult<Response>>,
    {
        for link in links {
            match link.handle(ctx).await? {
                Flow::Continue(next) => ctx = next,
                Flow::Halt(response) => return Ok(response),
                Flow::Fail(error) => {
                    if !production() {
                        tracing::warn!(
                            "a middleware passed an error to its continuation, return Err instead"
                        );
                    }
                    return Err(error);
                }
            }
        }
        terminal(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::HttpError;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    fn ctx() -> Context {
        Context::new(Request::builder().uri("/").body(Body::empty()).unwrap())
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> Arc<dyn Middleware> {
        let log = log.clone();
        from_fn(move |ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(label);
                Ok(Flow::Continue(ctx))
            }
        })
    }

    fn terminal_handler(log: &Arc<Mutex<Vec<&'static str>>>) -> BoxedHandler {
        let log = log.clone();
        Arc::new(move |_ctx| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push("terminal");
                Ok("done".into_response())
            })
        })
    }

    #[tokio::test]
    async fn links_run_in_declared_order_then_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(
            vec![
                recorder(&log, "first"),
                recorder(&log, "second"),
                recorder(&log, "third"),
            ],
            terminal_handler(&log),
        );

        chain.run(ctx()).await.unwrap();
        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["first", "second", "third", "terminal"]
        );
    }

    #[tokio::test]
    async fn empty_chain_degrades_to_the_terminal_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(Vec::new(), terminal_handler(&log));
        let response = chain.run(ctx()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(log.lock().unwrap().as_slice(), ["terminal"]);
    }

    #[tokio::test]
    async fn halt_short_circuits_without_reaching_the_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let halt = from_fn(|_ctx| async move {
            Ok(Flow::Halt(
                (StatusCode::NO_CONTENT, "").into_response(),
            ))
        });
        let chain = Chain::new(vec![halt, recorder(&log, "after")], terminal_handler(&log));

        let response = chain.run(ctx()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn err_funnels_and_skips_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = from_fn(|_ctx| async move {
            Err(Box::new(HttpError::new("nope")) as ChainError)
        });
        let chain = Chain::new(vec![failing, recorder(&log, "after")], terminal_handler(&log));

        let error = chain.run(ctx()).await.unwrap_err();
        assert!(error.downcast_ref::<HttpError>().is_some());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fail_is_treated_as_err() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = from_fn(|_ctx| async move {
            Ok(Flow::Fail(Box::new(HttpError::new("nope")) as ChainError))
        });
        let chain = Chain::new(vec![failing], terminal_handler(&log));

        let error = chain.run(ctx()).await.unwrap_err();
        assert!(error.downcast_ref::<HttpError>().is_some());
        assert!(log.lock().unwrap().is_empty());
    }
}
