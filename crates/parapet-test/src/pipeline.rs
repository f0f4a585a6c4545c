//! TestPipeline: render a markup string without a full build.

use std::sync::Arc;

use parapet_core::{
    ComponentInstance, EndpointResultHandler, Environment, MiddlewareHandler, Pipeline,
    RenderContext, RenderError, Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the markup compiler or the component loader.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compilation failed: {0}")]
    Failed(String),

    #[error("failed to load compiled component: {0}")]
    Load(String),
}

/// Errors from TestPipeline operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("response body is not UTF-8: {0}")]
    Body(#[from] std::string::FromUtf8Error),
}

/// A compiler warning or error attached to a transform result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: u32,
    pub text: String,
}

/// Output of a markup compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResult {
    /// Generated module source.
    pub code: String,
    /// Extracted stylesheets.
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles markup source into a module.
pub trait MarkupCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<TransformResult, CompileError>;
}

/// Turns a compiled module into something the pipeline can render.
pub trait ComponentLoader: Send + Sync {
    fn load(&self, result: &TransformResult)
        -> Result<(RenderContext, ComponentInstance), CompileError>;
}

/// Pipeline in test mode over a basic environment.
///
/// Compilation and loading are delegated to the supplied collaborators;
/// rendering goes through the regular pipeline, middleware included.
pub struct TestPipeline {
    pipeline: Pipeline,
    compiler: Arc<dyn MarkupCompiler>,
    loader: Arc<dyn ComponentLoader>,
}

impl TestPipeline {
    pub fn new(
        compiler: impl MarkupCompiler + 'static,
        loader: impl ComponentLoader + 'static,
    ) -> Self {
        Self {
            pipeline: Pipeline::test(Arc::new(Environment::basic())),
            compiler: Arc::new(compiler),
            loader: Arc::new(loader),
        }
    }

    pub fn set_middleware_function(&mut self, middleware: MiddlewareHandler) {
        self.pipeline.set_middleware_function(middleware);
    }

    pub fn set_endpoint_handler(&mut self, handler: EndpointResultHandler) {
        self.pipeline.set_endpoint_handler(handler);
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Compile `contents`, load it and render it.
    pub async fn render_page(&self, contents: &str) -> Result<Response, TestError> {
        let compiled = self.compiler.compile(contents)?;
        let (ctx, component) = self.loader.load(&compiled)?;
        Ok(self.pipeline.render_route(ctx, &component).await?)
    }

    /// Like [`render_page`](Self::render_page), returning the body as text.
    pub async fn render_page_text(&self, contents: &str) -> Result<String, TestError> {
        let response = self.render_page(contents).await?;
        Ok(String::from_utf8(response.into_body().to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use parapet_core::response::html;
    use parapet_core::{page_fn, PipelineMode, RouteData, RouteRequest};

    struct Verbatim;

    impl MarkupCompiler for Verbatim {
        fn compile(&self, source: &str) -> Result<TransformResult, CompileError> {
            if source.contains("<<") {
                return Err(CompileError::Failed("unexpected `<<`".into()));
            }
            Ok(TransformResult {
                code: source.to_string(),
                ..Default::default()
            })
        }
    }

    struct Static;

    impl ComponentLoader for Static {
        fn load(
            &self,
            result: &TransformResult,
        ) -> Result<(RenderContext, ComponentInstance), CompileError> {
            let request = http::Request::builder()
                .uri("/")
                .body(Bytes::new())
                .map_err(|e| CompileError::Load(e.to_string()))?;
            let request = RouteRequest::new(request).map_err(|e| CompileError::Load(e.to_string()))?;
            let code = result.code.clone();
            let page = page_fn(move |_ctx| {
                let code = code.clone();
                async move { Ok(html(code)) }
            });
            Ok((
                RenderContext::new(request, RouteData::page("/")),
                ComponentInstance::Page(page),
            ))
        }
    }

    #[tokio::test]
    async fn renders_compiled_markup() {
        let harness = TestPipeline::new(Verbatim, Static);
        assert_eq!(harness.pipeline().mode(), PipelineMode::Test);

        let text = harness.render_page_text("<p>hi</p>").await.unwrap();
        assert_eq!(text, "<p>hi</p>");
    }

    #[tokio::test]
    async fn compile_errors_propagate() {
        let harness = TestPipeline::new(Verbatim, Static);
        let err = harness.render_page("<<").await.unwrap_err();
        assert!(matches!(err, TestError::Compile(CompileError::Failed(_))));
    }

    #[test]
    fn transform_result_deserializes_with_defaults() {
        let result: TransformResult = serde_json::from_str(r#"{"code": "export default 1"}"#).unwrap();
        assert_eq!(result.code, "export default 1");
        assert!(result.css.is_empty());
        assert!(result.diagnostics.is_empty());
    }
}
