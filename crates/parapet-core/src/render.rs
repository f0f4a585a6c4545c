//! Render collaborator: runs the user code behind a route.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::context::{ApiContext, Props};
use crate::cookies::attach_cookies_to_response;
use crate::endpoint::{call_endpoint, context_for, EndpointCallResult, EndpointHandler, HandlerOutput};
use crate::environment::Environment;
use crate::error::RenderError;
use crate::middleware::{call_middleware, MiddlewareHandler, Next};
use crate::request::RouteRequest;
use crate::response::{self, Response};
use crate::route::{Params, RouteData, RouteType};

/// Inputs of a single render.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub request: RouteRequest,
    pub route: RouteData,
    pub params: Params,
    pub props: Props,
}

impl RenderContext {
    pub fn new(request: RouteRequest, route: RouteData) -> Self {
        Self {
            request,
            route,
            params: Params::new(),
            props: Props::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }
}

/// Page renderer: produces the page's markup response.
pub type PageHandler =
    Arc<dyn Fn(ApiContext) -> BoxFuture<'static, Result<Response, RenderError>> + Send + Sync>;

/// Wrap an async closure as a [`PageHandler`].
pub fn page_fn<F, Fut>(f: F) -> PageHandler
where
    F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, RenderError>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Loaded module behind a route.
#[derive(Clone)]
pub enum ComponentInstance {
    Page(PageHandler),
    Endpoint(EndpointHandler),
}

impl ComponentInstance {
    pub fn kind(&self) -> &'static str {
        match self {
            ComponentInstance::Page(_) => "page",
            ComponentInstance::Endpoint(_) => "endpoint",
        }
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ComponentInstance").field(&self.kind()).finish()
    }
}

/// Result of [`RouteRenderer::try_render_route`].
#[derive(Debug)]
pub enum RenderOutcome {
    /// Pages and redirects.
    Response(Response),
    /// Endpoint routes.
    Endpoint(EndpointCallResult),
}

/// Turns a route and its component into a response or endpoint result.
pub trait RouteRenderer: Send + Sync {
    fn try_render_route<'a>(
        &'a self,
        ctx: &'a RenderContext,
        env: &'a Environment,
        component: &'a ComponentInstance,
        middleware: Option<&'a MiddlewareHandler>,
    ) -> BoxFuture<'a, Result<RenderOutcome, RenderError>>;
}

/// Built-in renderer for redirect, endpoint, page and fallback routes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRenderer;

impl RouteRenderer for DefaultRenderer {
    fn try_render_route<'a>(
        &'a self,
        ctx: &'a RenderContext,
        env: &'a Environment,
        component: &'a ComponentInstance,
        middleware: Option<&'a MiddlewareHandler>,
    ) -> BoxFuture<'a, Result<RenderOutcome, RenderError>> {
        async move {
            match ctx.route.route_type {
                RouteType::Redirect => render_redirect(ctx).map(RenderOutcome::Response),
                RouteType::Endpoint => {
                    let ComponentInstance::Endpoint(handler) = component else {
                        return Err(mismatch(ctx, "an endpoint handler"));
                    };
                    call_endpoint(handler, env, ctx, middleware)
                        .await
                        .map(RenderOutcome::Endpoint)
                }
                RouteType::Page | RouteType::Fallback => {
                    let ComponentInstance::Page(page) = component else {
                        return Err(mismatch(ctx, "a page component"));
                    };
                    render_page(page, env, ctx, middleware)
                        .await
                        .map(RenderOutcome::Response)
                }
            }
        }
        .boxed()
    }
}

fn mismatch(ctx: &RenderContext, expected: &'static str) -> RenderError {
    RenderError::ComponentMismatch {
        route: ctx.route.route.clone(),
        expected,
    }
}

fn render_redirect(ctx: &RenderContext) -> Result<Response, RenderError> {
    let target = ctx
        .route
        .redirect
        .as_ref()
        .ok_or_else(|| mismatch(ctx, "a redirect target"))?;
    response::redirect(&target.location, target.status)
}

async fn render_page(
    page: &PageHandler,
    env: &Environment,
    ctx: &RenderContext,
    middleware: Option<&MiddlewareHandler>,
) -> Result<Response, RenderError> {
    let context = context_for(env, ctx)?;

    let mut response = match middleware {
        Some(middleware) => {
            let page = page.clone();
            let target = context.clone();
            let next = Next::new(move || {
                let rendered = page(target.clone());
                async move { rendered.await.map(HandlerOutput::Response) }
            });
            match call_middleware(middleware, context.clone(), next).await? {
                HandlerOutput::Response(response) => response,
                HandlerOutput::Payload(_) => return Err(RenderError::MiddlewareNotAResponse),
            }
        }
        None => page(context.clone()).await?,
    };

    attach_cookies_to_response(&mut response, context.cookies())?;
    Ok(response)
}
