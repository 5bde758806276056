use thiserror::Error;

use crate::engine::EngineError;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderRequest {
    /// Source markdown of the report.
    pub markdown: String,
    /// Pass-through arguments snippets see as `argv`.
    pub argv: Vec<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            argv: Vec::new(),
        }
    }

    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }
}

/// A fully woven document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Complete HTML document.
    pub html: String,
    /// Title placed in `<title>`: the first heading, or the configured default.
    pub title: String,
    /// Number of code blocks executed.
    pub block_count: u64,
    /// Number of inline expressions evaluated.
    pub inline_count: u64,
    /// Whether the body contains math handed to MathJax.
    pub contains_math: bool,
}

/// Structured errors surfaced by the rendering pipeline. All of them abort the
/// document; no partial output is produced.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("document template failed: {message}")]
    Template { message: String },
    #[error("failed to start the evaluation thread: {message}")]
    Thread { message: String },
}

/// Trait exposed by the rendering pipeline. Every call weaves the document in
/// a fresh session; nothing carries over between calls.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
