//! Middleware-set locals reach a page rendered through the test pipeline.

use bytes::Bytes;
use parapet_core::response::html;
use parapet_core::{
    middleware_fn, page_fn, ApiContext, ComponentInstance, Next, RenderContext, RouteData,
    RouteRequest,
};
use parapet_test::{CompileError, ComponentLoader, MarkupCompiler, TestPipeline, TransformResult};
use serde_json::json;

const PAGE: &str = r#"
---
const title = locals.title;
---
<title>{title}</title>
"#;

/// Keeps only the markup below the frontmatter fence.
struct FrontmatterStripper;

impl MarkupCompiler for FrontmatterStripper {
    fn compile(&self, source: &str) -> Result<TransformResult, CompileError> {
        let markup = source
            .rsplit_once("---")
            .map(|(_, markup)| markup)
            .unwrap_or(source)
            .trim()
            .to_string();
        Ok(TransformResult {
            code: markup,
            ..Default::default()
        })
    }
}

/// Renders the compiled markup, substituting `{title}` from locals.
struct LocalsTemplate;

impl ComponentLoader for LocalsTemplate {
    fn load(
        &self,
        result: &TransformResult,
    ) -> Result<(RenderContext, ComponentInstance), CompileError> {
        let request = http::Request::builder()
            .uri("http://localhost/")
            .body(Bytes::new())
            .map_err(|e| CompileError::Load(e.to_string()))?;
        let request = RouteRequest::new(request).map_err(|e| CompileError::Load(e.to_string()))?;

        let template = result.code.clone();
        let page = page_fn(move |ctx: ApiContext| {
            let template = template.clone();
            async move {
                let title = ctx
                    .local("title")
                    .and_then(|t| t.as_str().map(str::to_string))
                    .unwrap_or_default();
                Ok(html(template.replace("{title}", &title)))
            }
        });

        Ok((
            RenderContext::new(request, RouteData::page("/")),
            ComponentInstance::Page(page),
        ))
    }
}

#[tokio::test]
async fn middleware_locals_reach_the_page() {
    let mut harness = TestPipeline::new(FrontmatterStripper, LocalsTemplate);
    harness.set_middleware_function(middleware_fn(|ctx: ApiContext, next: Next| async move {
        ctx.set_locals(json!({"title": "Test"}))?;
        next.run().await
    }));

    let text = harness.render_page_text(PAGE).await.unwrap();
    assert!(text.contains("Test"));
    assert_eq!(text, "<title>Test</title>");
}

#[tokio::test]
async fn without_middleware_locals_are_empty() {
    let harness = TestPipeline::new(FrontmatterStripper, LocalsTemplate);
    let text = harness.render_page_text(PAGE).await.unwrap();
    assert_eq!(text, "<title></title>");
}

#[tokio::test]
async fn middleware_rejecting_non_object_locals_fails_the_render() {
    let mut harness = TestPipeline::new(FrontmatterStripper, LocalsTemplate);
    harness.set_middleware_function(middleware_fn(|ctx: ApiContext, next: Next| async move {
        ctx.set_locals(json!("Test"))?;
        next.run().await
    }));

    let err = harness.render_page(PAGE).await.unwrap_err();
    assert!(err.to_string().contains("locals"));
}
