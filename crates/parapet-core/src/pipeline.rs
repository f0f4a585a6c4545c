//! Rendering pipeline.
//!
//! One orchestrator serves every mode. Modes differ only in the endpoint
//! result handler registered at construction and in whether the route
//! cache may be cleared:
//!
//! - `Dev`: route cache can be cleared between rebuilds.
//! - `Build`: plain pipeline.
//! - `Ssr`: translates structured endpoint payloads into responses.
//! - `Test`: plain pipeline, driven by the test harness.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};

use crate::cookies::attach_cookies_to_response;
use crate::endpoint::EndpointCallResult;
use crate::environment::Environment;
use crate::error::RenderError;
use crate::middleware::MiddlewareHandler;
use crate::render::{ComponentInstance, DefaultRenderer, RenderContext, RenderOutcome, RouteRenderer};
use crate::request::RouteRequest;
use crate::response::{is_not_found_sentinel, Response};
use crate::route::RouteType;

const DEFAULT_MIME: &str = "text/plain";

/// Translates an endpoint call result into the final response.
pub type EndpointResultHandler = Arc<
    dyn Fn(RouteRequest, EndpointCallResult) -> BoxFuture<'static, Result<Response, RenderError>>
        + Send
        + Sync,
>;

/// Wrap an async closure as an [`EndpointResultHandler`].
pub fn endpoint_result_handler_fn<F, Fut>(f: F) -> EndpointResultHandler
where
    F: Fn(RouteRequest, EndpointCallResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, RenderError>> + Send + 'static,
{
    Arc::new(move |request, result| f(request, result).boxed())
}

/// Where the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineMode {
    Dev,
    Build,
    Ssr,
    Test,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Dev => "dev",
            PipelineMode::Build => "build",
            PipelineMode::Ssr => "ssr",
            PipelineMode::Test => "test",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequences middleware, render, endpoint-result translation and
/// response finalization for one route at a time.
pub struct Pipeline {
    env: Arc<Environment>,
    mode: PipelineMode,
    renderer: Arc<dyn RouteRenderer>,
    middleware: Option<MiddlewareHandler>,
    endpoint_handler: Option<EndpointResultHandler>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("mode", &self.mode)
            .field("env", &self.env)
            .field("middleware", &self.middleware.is_some())
            .field("endpoint_handler", &self.endpoint_handler.is_some())
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline for `mode`. SSR pipelines register
    /// [`ssr_endpoint_handler`] as their endpoint result handler.
    pub fn new(env: Arc<Environment>, mode: PipelineMode) -> Self {
        let endpoint_handler = match mode {
            PipelineMode::Ssr => Some(endpoint_result_handler_fn(|request, result| async move {
                ssr_endpoint_handler(&request, result)
            })),
            _ => None,
        };

        Self {
            env,
            mode,
            renderer: Arc::new(DefaultRenderer),
            middleware: None,
            endpoint_handler,
        }
    }

    pub fn dev(env: Arc<Environment>) -> Self {
        Self::new(env, PipelineMode::Dev)
    }

    pub fn build(env: Arc<Environment>) -> Self {
        Self::new(env, PipelineMode::Build)
    }

    pub fn ssr(env: Arc<Environment>) -> Self {
        Self::new(env, PipelineMode::Ssr)
    }

    pub fn test(env: Arc<Environment>) -> Self {
        Self::new(env, PipelineMode::Test)
    }

    /// Replace the render collaborator.
    pub fn with_renderer(mut self, renderer: Arc<dyn RouteRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn set_endpoint_handler(&mut self, handler: EndpointResultHandler) {
        self.endpoint_handler = Some(handler);
    }

    pub fn set_middleware_function(&mut self, middleware: MiddlewareHandler) {
        self.middleware = Some(middleware);
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Render a route into its final response.
    pub async fn render_route(
        &self,
        ctx: RenderContext,
        component: &ComponentInstance,
    ) -> Result<Response, RenderError> {
        let route_type = ctx.route.route_type;
        let outcome = self
            .renderer
            .try_render_route(&ctx, &self.env, component, self.middleware.as_ref())
            .await?;

        let response = match outcome {
            RenderOutcome::Endpoint(result) if route_type == RouteType::Endpoint => {
                let handler = self
                    .endpoint_handler
                    .as_ref()
                    .ok_or(RenderError::MissingEndpointHandler)?;
                handler(ctx.request.clone(), result).await?
            }
            RenderOutcome::Endpoint(EndpointCallResult::Response(response)) => response,
            RenderOutcome::Endpoint(EndpointCallResult::Simple { .. }) => {
                return Err(RenderError::UnexpectedEndpointResult {
                    route_type: route_type.to_string(),
                });
            }
            RenderOutcome::Response(response) => response,
        };

        parapet_telemetry::log_route_rendered!(
            mode = %self.mode,
            route = %ctx.route.route,
            route_type = %route_type,
            status = response.status().as_u16(),
            "route rendered"
        );

        Ok(response)
    }

    /// Whether `outcome` must go through the endpoint result handler.
    pub fn is_endpoint_result(outcome: &RenderOutcome, route_type: RouteType) -> bool {
        matches!(outcome, RenderOutcome::Endpoint(_)) && route_type == RouteType::Endpoint
    }

    /// Whether `outcome` is already the final response of a page or redirect.
    pub fn is_response(outcome: &RenderOutcome, route_type: RouteType) -> bool {
        matches!(outcome, RenderOutcome::Response(_))
            && matches!(route_type, RouteType::Page | RouteType::Redirect)
    }

    /// Drop all cached route metadata. Only the dev pipeline owns a
    /// clearable cache.
    pub fn clear_route_cache(&self) -> Result<(), RenderError> {
        if self.mode != PipelineMode::Dev {
            return Err(RenderError::RouteCacheUnavailable {
                mode: self.mode.to_string(),
            });
        }

        let cache = self.env.route_cache();
        let entries = cache.len();
        cache.clear_all();
        parapet_telemetry::log_route_cache_cleared!(entries, "route cache cleared");
        Ok(())
    }
}

/// Endpoint result handler of the SSR pipeline.
///
/// Raw responses pass through unless they carry the not-found sentinel.
/// Structured payloads become a 200 response typed from the request
/// path's extension.
pub fn ssr_endpoint_handler(
    request: &RouteRequest,
    result: EndpointCallResult,
) -> Result<Response, RenderError> {
    match result {
        EndpointCallResult::Response(response) => {
            if is_not_found_sentinel(&response) {
                return Err(RenderError::NotFound);
            }
            Ok(response)
        }
        EndpointCallResult::Simple { output, cookies } => {
            let mime = mime_guess::from_path(request.url().path())
                .first_raw()
                .unwrap_or(DEFAULT_MIME);
            let body: Bytes = output.body_bytes();

            let mut response = Response::new(Bytes::new());
            *response.status_mut() = StatusCode::OK;
            let headers = response.headers_mut();
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_str(&format!("{mime};charset=utf-8"))?,
            );
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            *response.body_mut() = body;

            attach_cookies_to_response(&mut response, &cookies)?;
            Ok(response)
        }
    }
}
