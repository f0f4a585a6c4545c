//! Parapet core: the request-rendering pipeline.
//!
//! Turns a matched route plus its loaded component into an HTTP response,
//! optionally passing the request through a single middleware function.
//!
//! # Overview
//!
//! - [`route`]: route descriptors and URL building.
//! - [`context`]: the per-request [`ApiContext`] handed to user code.
//! - [`middleware`]: single-continuation middleware.
//! - [`endpoint`]: endpoint invocation and structured payloads.
//! - [`render`]: the render collaborator for pages, endpoints and redirects.
//! - [`pipeline`]: the orchestrator and its dev/build/SSR/test modes.

pub mod context;
pub mod cookies;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod middleware;
pub mod path;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod response;
pub mod route;

pub use context::{create_api_context, ApiContext, CreateApiContext, Props, GENERATOR};
pub use cookies::{attach_cookies_to_response, CookieJar, CookieOptions, SameSite};
pub use endpoint::{
    call_endpoint, endpoint_fn, BodyEncoding, EndpointBody, EndpointCallResult, EndpointHandler,
    EndpointOutput, HandlerOutput,
};
pub use environment::{ConfigError, Environment, EnvironmentBuilder, EnvironmentConfig, RouteCache};
pub use error::RenderError;
pub use middleware::{call_middleware, middleware_fn, HandlerResult, MiddlewareHandler, Next};
pub use pipeline::{
    endpoint_result_handler_fn, ssr_endpoint_handler, EndpointResultHandler, Pipeline,
    PipelineMode,
};
pub use render::{
    page_fn, ComponentInstance, DefaultRenderer, PageHandler, RenderContext, RenderOutcome,
    RouteRenderer,
};
pub use request::RouteRequest;
pub use response::Response;
pub use route::{create_route_url, Params, RedirectTarget, RouteData, RouteType, RouteUrlOptions};
