//! Test harness for Parapet.
//!
//! Provides `TestPipeline` for rendering a single markup string end to end
//! through the pipeline without a build.

pub mod pipeline;

pub use pipeline::{
    CompileError, ComponentLoader, Diagnostic, MarkupCompiler, TestError, TestPipeline,
    TransformResult,
};
