//! Endpoint invocation.
//!
//! Endpoint handlers either return a full [`Response`] or a structured
//! [`EndpointOutput`] that the serving mode later translates into one.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::HeaderMap;

use crate::context::{create_api_context, ApiContext, CreateApiContext};
use crate::cookies::{attach_cookies_to_response, CookieJar};
use crate::environment::Environment;
use crate::error::RenderError;
use crate::middleware::{call_middleware, HandlerResult, MiddlewareHandler, Next};
use crate::render::RenderContext;
use crate::response::Response;
use crate::route::{create_route_url, RouteUrlOptions};

/// Value returned by a route handler.
#[derive(Debug)]
pub enum HandlerOutput {
    /// The handler fully controls the wire response.
    Response(Response),
    /// A semantic description of the response.
    Payload(EndpointOutput),
}

impl From<Response> for HandlerOutput {
    fn from(response: Response) -> Self {
        HandlerOutput::Response(response)
    }
}

impl From<EndpointOutput> for HandlerOutput {
    fn from(output: EndpointOutput) -> Self {
        HandlerOutput::Payload(output)
    }
}

/// Body of a structured endpoint payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointBody {
    Text(String),
    Binary(Bytes),
}

impl EndpointBody {
    /// Raw bytes of the body. Text is UTF-8 encoded.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            EndpointBody::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            EndpointBody::Binary(bytes) => bytes.clone(),
        }
    }
}

/// Declared encoding of a structured payload body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyEncoding {
    Utf8,
    Binary,
    Other(String),
}

impl BodyEncoding {
    pub fn parse(encoding: &str) -> Self {
        match encoding.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => BodyEncoding::Utf8,
            "binary" => BodyEncoding::Binary,
            _ => BodyEncoding::Other(encoding.to_string()),
        }
    }
}

/// Structured endpoint payload.
#[derive(Debug, Clone)]
pub struct EndpointOutput {
    pub body: EndpointBody,
    pub encoding: Option<BodyEncoding>,
    pub headers: Option<HeaderMap>,
}

impl EndpointOutput {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: EndpointBody::Text(body.into()),
            encoding: None,
            headers: None,
        }
    }

    pub fn binary(body: impl Into<Bytes>) -> Self {
        Self {
            body: EndpointBody::Binary(body.into()),
            encoding: Some(BodyEncoding::Binary),
            headers: None,
        }
    }

    pub fn with_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Body bytes as they go on the wire.
    ///
    /// Decided by the body variant alone: text is UTF-8 encoded and binary
    /// bodies pass through unchanged. `encoding` only affects headers.
    pub fn body_bytes(&self) -> Bytes {
        self.body.to_bytes()
    }
}

/// Outcome of [`call_endpoint`].
#[derive(Debug)]
pub enum EndpointCallResult {
    /// The handler returned a response; cookies are already attached.
    Response(Response),
    /// The handler returned a payload; `cookies` is the context's jar.
    Simple {
        output: EndpointOutput,
        cookies: CookieJar,
    },
}

/// Handler of an endpoint route.
pub type EndpointHandler =
    Arc<dyn Fn(ApiContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Wrap an async closure as an [`EndpointHandler`].
pub fn endpoint_fn<F, Fut>(f: F) -> EndpointHandler
where
    F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Build the API context for a render, shared by endpoint and page routes.
///
/// The route URL falls back to the request's own origin when the
/// environment has no site; the context's `site` does not.
pub(crate) fn context_for(env: &Environment, ctx: &RenderContext) -> Result<ApiContext, RenderError> {
    let origin = ctx.request.url().origin().ascii_serialization();
    let route_url = create_route_url(
        &ctx.route,
        &RouteUrlOptions {
            params: Some(&ctx.params),
            site: Some(env.site().unwrap_or(&origin)),
            base: Some(env.base()),
        },
    )?;

    create_api_context(CreateApiContext {
        request: ctx.request.clone(),
        params: ctx.params.clone(),
        site: env.site().map(str::to_string),
        route_url,
        props: ctx.props.clone(),
        adapter_name: env.adapter_name().map(str::to_string),
    })
}

/// Run an endpoint handler, through `middleware` when one is supplied.
pub async fn call_endpoint(
    handler: &EndpointHandler,
    env: &Environment,
    ctx: &RenderContext,
    middleware: Option<&MiddlewareHandler>,
) -> Result<EndpointCallResult, RenderError> {
    let context = context_for(env, ctx)?;

    let output = match middleware {
        Some(middleware) => {
            let handler = handler.clone();
            let target = context.clone();
            let next = Next::new(move || handler(target.clone()));
            call_middleware(middleware, context.clone(), next).await?
        }
        None => handler(context.clone()).await?,
    };

    match output {
        HandlerOutput::Response(mut response) => {
            attach_cookies_to_response(&mut response, context.cookies())?;
            Ok(EndpointCallResult::Response(response))
        }
        HandlerOutput::Payload(output) => {
            if env.ssr() && !ctx.route.prerender {
                warn_on_ignored_fields(&ctx.route.route, &output);
            }
            Ok(EndpointCallResult::Simple {
                output,
                cookies: context.cookies().clone(),
            })
        }
    }
}

fn warn_on_ignored_fields(route: &str, output: &EndpointOutput) {
    if output.headers.is_some() {
        parapet_telemetry::log_endpoint_payload_warning!(
            route = %route,
            field = "headers",
            "setting headers is not supported when returning a payload; return a response instead"
        );
    }
    if output.encoding.is_some() {
        parapet_telemetry::log_endpoint_payload_warning!(
            route = %route,
            field = "encoding",
            "`encoding` is ignored on server-rendered routes; return a response to use another charset"
        );
    }
}
