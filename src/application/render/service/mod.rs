mod config;
mod highlight;
mod math;
mod rewrite;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use metrics::counter;
use tessera_script::on_eval_stack;
use tracing::{debug, info};

use crate::application::render::types::{
    RenderError, RenderOutput, RenderRequest, RenderService,
};
use crate::config::{DEFAULT_LANGUAGE, DEFAULT_THEME, DEFAULT_TITLE, PlotSettings, Settings};
use crate::engine::{DocumentSession, EnvironmentOptions, PlainSourceView, SourceView};
use crate::presentation::views::{DocumentView, render_document};

pub use highlight::SyntectSourceView;
use self::config::default_options;
use self::rewrite::{RewriteOutcome, rewrite_ast};

pub(crate) const METRIC_DOCUMENTS_TOTAL: &str = "tessera_documents_rendered_total";

/// Everything the pipeline needs from configuration.
#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub highlight: bool,
    pub theme: String,
    pub language: String,
    pub mathjax: bool,
    pub default_title: String,
    pub figure_size: (u32, u32),
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        let plot = PlotSettings::default();
        Self {
            highlight: true,
            theme: DEFAULT_THEME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            mathjax: true,
            default_title: DEFAULT_TITLE.to_string(),
            figure_size: (plot.width, plot.height),
        }
    }
}

impl From<&Settings> for RenderPipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            highlight: settings.render.highlight,
            theme: settings.render.theme.clone(),
            language: settings.render.language.clone(),
            mathjax: settings.render.mathjax,
            default_title: settings.render.default_title.clone(),
            figure_size: (settings.plot.width, settings.plot.height),
        }
    }
}

/// Comrak-based weaving pipeline: parse → run blocks and inline code →
/// format HTML → wrap in the document template.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    config: RenderPipelineConfig,
    theme_css: Option<String>,
}

impl ComrakRenderService {
    pub fn new(config: RenderPipelineConfig) -> Result<Self, RenderError> {
        let theme_css = if config.highlight {
            Some(highlight::theme_css(&config.theme)?)
        } else {
            None
        };
        Ok(Self {
            options: default_options(),
            config,
            theme_css,
        })
    }

    fn source_view(&self) -> Box<dyn SourceView> {
        if self.config.highlight {
            Box::new(SyntectSourceView::new(self.config.language.clone()))
        } else {
            Box::new(PlainSourceView)
        }
    }
}

impl RenderService for ComrakRenderService {
    /// Weaves on a dedicated thread with [`tessera_script::EVAL_STACK_SIZE`] of stack, so the
    /// snippet language's nesting bounds hold whatever thread calls this.
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        on_eval_stack(|| self.weave_document(request)).map_err(|err| RenderError::Thread {
            message: err.to_string(),
        })?
    }
}

impl ComrakRenderService {
    fn weave_document(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let mut session = DocumentSession::new(
            EnvironmentOptions {
                argv: request.argv.clone(),
                figure_size: self.config.figure_size,
            },
            self.source_view(),
        );
        let RewriteOutcome {
            title,
            contains_math,
        } = rewrite_ast(root, &mut session)?;

        let body = render_html_stage(root, &self.options)?;
        let title = title.unwrap_or_else(|| self.config.default_title.clone());
        debug!(title = %title, bytes = body.len(), "document body rendered");

        let html = render_document(&DocumentView {
            title: &title,
            body: &body,
            theme_css: self.theme_css.as_deref(),
            mathjax: self.config.mathjax && contains_math,
        })
        .map_err(|err| RenderError::Template {
            message: err.to_string(),
        })?;

        let output = RenderOutput {
            html,
            title,
            block_count: session.blocks_run(),
            inline_count: session.inlines_run(),
            contains_math,
        };
        counter!(METRIC_DOCUMENTS_TOTAL).increment(1);
        info!(
            blocks = output.block_count,
            inline = output.inline_count,
            "document woven"
        );
        Ok(output)
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}
