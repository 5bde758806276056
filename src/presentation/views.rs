use askama::{Error as AskamaError, Template};
use thiserror::Error;

const DOCUMENT_STYLESHEET: &str = include_str!("../../static/document.css");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

/// What the document template needs from a finished weave.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    pub title: &'a str,
    /// Rendered body HTML; inserted verbatim.
    pub body: &'a str,
    /// Highlighting theme stylesheet, when block sources are highlighted.
    pub theme_css: Option<&'a str>,
    pub mathjax: bool,
}

#[derive(Template)]
#[template(path = "document.html")]
struct DocumentTemplate<'a> {
    title: &'a str,
    body: &'a str,
    stylesheet: &'a str,
    theme_css: Option<&'a str>,
    mathjax: bool,
}

pub fn render_document(view: &DocumentView<'_>) -> Result<String, TemplateRenderError> {
    let template = DocumentTemplate {
        title: view.title,
        body: view.body,
        stylesheet: DOCUMENT_STYLESHEET,
        theme_css: view.theme_css,
        mathjax: view.mathjax,
    };
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_document",
            "Document template rendering failed",
            err,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'a>(title: &'a str, body: &'a str) -> DocumentView<'a> {
        DocumentView {
            title,
            body,
            theme_css: None,
            mathjax: false,
        }
    }

    #[test]
    fn title_is_escaped_and_body_is_verbatim() {
        let html = render_document(&view("A & B", "<p>body</p>")).expect("render");
        assert!(html.contains("<title>A &amp; B</title>"), "{html}");
        assert!(html.contains("<p>body</p>"), "{html}");
        assert!(!html.contains("MathJax"), "{html}");
    }

    #[test]
    fn optional_includes_follow_the_view() {
        let html = render_document(&DocumentView {
            theme_css: Some(".syntax-keyword { color: red; }"),
            mathjax: true,
            ..view("T", "")
        })
        .expect("render");
        assert!(html.contains(".syntax-keyword { color: red; }"), "{html}");
        assert!(html.contains("mathjax"), "{html}");
    }
}
