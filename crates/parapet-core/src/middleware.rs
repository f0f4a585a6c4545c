//! Single-continuation middleware.
//!
//! A middleware receives the API context and a [`Next`] continuation. It
//! decides whether and when the target handler runs by awaiting
//! [`Next::run`]; if it never does, the handler has no side effects.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::context::ApiContext;
use crate::endpoint::HandlerOutput;
use crate::error::RenderError;

/// Result of a handler, a middleware or a continuation.
pub type HandlerResult = Result<HandlerOutput, RenderError>;

/// User-supplied interceptor run before the route handler.
pub type MiddlewareHandler =
    Arc<dyn Fn(ApiContext, Next) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Wrap an async closure as a [`MiddlewareHandler`].
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareHandler
where
    F: Fn(ApiContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx, next| f(ctx, next).boxed())
}

type Continuation = Arc<dyn Fn() -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Continuation that runs the target handler.
#[derive(Clone)]
pub struct Next {
    continuation: Continuation,
    calls: Arc<AtomicUsize>,
}

impl Next {
    /// Build a continuation from a closure producing the handler future.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            continuation: Arc::new(move || f().boxed()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run the target handler and return its output.
    pub async fn run(&self) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.continuation)().await
    }

    /// Number of times the continuation ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether the continuation ran at least once.
    pub fn called(&self) -> bool {
        self.calls() > 0
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("calls", &self.calls()).finish()
    }
}

/// Invoke `middleware` once with `ctx` and `next`.
///
/// Whatever the middleware or the continuation produce, including
/// errors, is returned unmodified.
pub async fn call_middleware(
    middleware: &MiddlewareHandler,
    ctx: ApiContext,
    next: Next,
) -> HandlerResult {
    let tracker = next.clone();
    let result = middleware(ctx, next).await;

    if !tracker.called() {
        parapet_telemetry::log_middleware_short_circuit!(
            ok = result.is_ok(),
            "middleware answered without calling next"
        );
    }

    result
}
