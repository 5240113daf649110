use crate::chain::{Chain, ChainResult, Middleware};
use crate::context::Context;
use crate::exception::ErrorHandler;
use axum::extract::Request;
use axum::response::Response;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service};

pub(crate) type ContextFuture = Pin<Box<dyn Future<Output = ChainResult<Context>> + Send>>;
pub(crate) type ContextBuilderFn = Arc<dyn Fn(Context) -> ContextFuture + Send + Sync>;

pub(crate) struct BoundaryState {
    pub(crate) context: Option<ContextBuilderFn>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) error_handler: Arc<dyn ErrorHandler>,
}

/// The per-request boundary wrapped around the whole router.
///
/// Runs the context-injection step, then each global middleware in order,
/// then the inner router; anything funneled out of that sequence is converted
/// by the terminal error handler, so the layered service itself cannot fail.
#[derive(Clone)]
pub(crate) struct BoundaryLayer {
    state: Arc<BoundaryState>,
}

impl BoundaryLayer {
    pub(crate) fn new(state: BoundaryState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

impl<S> Layer<S> for BoundaryLayer {
    type Service = BoundaryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BoundaryService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct BoundaryService<S> {
    inner: S,
    state: Arc<BoundaryState>,
}

impl<S> Service<Request> for BoundaryService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let state = self.state.clone();
        // take the ready service, leave a clone behind
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut ctx = Context::new(request);

            if let Some(build) = &state.context {
                match build(ctx).await {
                    Ok(with_context) => ctx = with_context,
                    Err(error) => return Ok(state.error_handler.handle(error)),
                }
            }

            let result = Chain::execute(&state.middlewares, ctx, move |ctx| {
                let mut inner = inner;
                async move {
                    inner
                        .call(ctx.into_request())
                        .await
                        .map_err(|never| match never {})
                }
            })
            .await;

            Ok(result.unwrap_or_else(|error| state.error_handler.handle(error)))
        })
    }
}
