//! Request handling on top of the rendering pipeline.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use parapet_core::{
    ComponentInstance, Params, Pipeline, PipelineMode, Props, RenderContext, RenderError,
    Response, RouteData, RouteRequest,
};
use uuid::Uuid;

/// A route matched for a request, with everything needed to render it.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub route: RouteData,
    pub params: Params,
    pub props: Props,
    pub component: ComponentInstance,
}

impl ResolvedRoute {
    pub fn new(route: RouteData, component: ComponentInstance) -> Self {
        Self {
            route,
            params: Params::new(),
            props: Props::new(),
            component,
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

/// Matches requests to routes.
pub trait RouteResolver: Send + Sync {
    /// The route for `request`, or `None` when nothing matches.
    fn resolve(&self, request: &RouteRequest) -> Option<ResolvedRoute>;
}

/// A pipeline plus route resolution, answering every request with a response.
pub struct App {
    pipeline: Pipeline,
    resolver: Arc<dyn RouteResolver>,
}

impl App {
    pub fn new(pipeline: Pipeline, resolver: Arc<dyn RouteResolver>) -> Self {
        Self { pipeline, resolver }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Render `request`, turning failures into error responses.
    pub async fn handle(&self, request: RouteRequest) -> Response {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = match self.resolver.resolve(&request) {
            Some(resolved) => {
                let ctx = RenderContext::new(request, resolved.route)
                    .with_params(resolved.params)
                    .with_props(resolved.props);
                match self.pipeline.render_route(ctx, &resolved.component).await {
                    Ok(response) => response,
                    Err(err) => self.error_response(&request_id, &path, err),
                }
            }
            None => not_found(),
        };

        parapet_telemetry::log_request_completed!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "request completed"
        );

        response
    }

    fn error_response(&self, request_id: &Uuid, path: &str, err: RenderError) -> Response {
        if err.is_not_found() {
            return not_found();
        }

        parapet_telemetry::log_render_error!(
            request_id = %request_id,
            path = %path,
            error = %err,
            "failed to render route"
        );

        let status = err.status_code();
        let body = if self.pipeline.mode() == PipelineMode::Dev {
            format!("{}: {}", status, err)
        } else {
            status.to_string()
        };
        plain(status, body)
    }
}

fn not_found() -> Response {
    plain(StatusCode::NOT_FOUND, StatusCode::NOT_FOUND.to_string())
}

fn plain(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use parapet_core::response::{html, not_found_sentinel};
    use parapet_core::{endpoint_fn, page_fn, ApiContext, Environment, EndpointOutput};
    use std::collections::HashMap;

    struct Table(HashMap<&'static str, ResolvedRoute>);

    impl RouteResolver for Table {
        fn resolve(&self, request: &RouteRequest) -> Option<ResolvedRoute> {
            self.0.get(request.url().path()).cloned()
        }
    }

    fn app(mode: PipelineMode) -> App {
        let mut routes = HashMap::new();
        routes.insert(
            "/",
            ResolvedRoute::new(
                RouteData::page("/"),
                ComponentInstance::Page(page_fn(|_ctx| async move { Ok(html("<h1>home</h1>")) })),
            ),
        );
        routes.insert(
            "/hello.txt",
            ResolvedRoute::new(
                RouteData::endpoint("/hello.txt"),
                ComponentInstance::Endpoint(endpoint_fn(|_ctx| async move {
                    Ok(EndpointOutput::text("hello").into())
                })),
            ),
        );
        routes.insert(
            "/gone",
            ResolvedRoute::new(
                RouteData::endpoint("/gone"),
                ComponentInstance::Endpoint(endpoint_fn(|_ctx| async move {
                    Ok(not_found_sentinel().into())
                })),
            ),
        );
        routes.insert(
            "/ip",
            ResolvedRoute::new(
                RouteData::endpoint("/ip"),
                ComponentInstance::Endpoint(endpoint_fn(|ctx: ApiContext| async move {
                    Ok(EndpointOutput::text(ctx.client_address()?).into())
                })),
            ),
        );

        let pipeline = Pipeline::new(Arc::new(Environment::basic()), mode);
        App::new(pipeline, Arc::new(Table(routes)))
    }

    fn request(uri: &str) -> RouteRequest {
        RouteRequest::new(http::Request::builder().uri(uri).body(Bytes::new()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn renders_page() {
        let response = app(PipelineMode::Ssr).handle(request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &Bytes::from("<h1>home</h1>"));
    }

    #[tokio::test]
    async fn renders_endpoint_payload() {
        let response = app(PipelineMode::Ssr).handle(request("/hello.txt")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain;charset=utf-8");
    }

    #[tokio::test]
    async fn unresolved_route_is_404() {
        let response = app(PipelineMode::Ssr).handle(request("/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sentinel_becomes_404() {
        let response = app(PipelineMode::Ssr).handle(request("/gone")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response
            .headers()
            .get(&parapet_core::response::RESPONSE_SENTINEL_HEADER)
            .is_none());
    }

    #[tokio::test]
    async fn render_failure_is_500_without_details() {
        let response = app(PipelineMode::Ssr).handle(request("/ip")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), &Bytes::from("500 Internal Server Error"));
    }

    #[tokio::test]
    async fn dev_mode_shows_error_message() {
        // Dev pipelines have no endpoint result handler.
        let response = app(PipelineMode::Dev).handle(request("/hello.txt")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("endpoint handler"));
    }

    #[tokio::test]
    async fn client_address_from_request_tag() {
        let response = app(PipelineMode::Ssr)
            .handle(request("/ip").with_client_address("192.0.2.1"))
            .await;
        assert_eq!(response.body(), &Bytes::from("192.0.2.1"));
    }
}
