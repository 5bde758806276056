use once_cell::sync::Lazy;
use syntect::{
    highlighting::ThemeSet,
    html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;
use crate::engine::{EngineError, SourceView};
use crate::util::html::escape;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

pub(crate) const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

pub(crate) fn highlight_code(
    language: &str,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let syntax =
        find_syntax(syntax_set, language).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: language.to_string(),
                message: err.to_string(),
            })?;
    }

    let highlighted = generator.finalize();
    let lang = language.to_ascii_lowercase();
    Ok(format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{}\"><code class=\"language-{lang} syntax-code\">{highlighted}</code></pre>",
        escape(language)
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

/// Stylesheet for `theme` matching the classes [`highlight_code`] emits.
pub(crate) fn theme_css(theme: &str) -> Result<String, RenderError> {
    let found = THEME_SET
        .themes
        .get(theme)
        .ok_or_else(|| RenderError::Highlighting {
            language: "css".to_string(),
            message: format!("unknown theme `{theme}`"),
        })?;
    css_for_theme_with_class_style(found, CLASS_STYLE).map_err(|err| RenderError::Highlighting {
        language: "css".to_string(),
        message: err.to_string(),
    })
}

/// Block sources highlighted as one fixed language.
#[derive(Debug, Clone)]
pub struct SyntectSourceView {
    language: String,
    syntax_set: &'static SyntaxSet,
}

impl SyntectSourceView {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            syntax_set: &SYNTAX_SET,
        }
    }
}

impl SourceView for SyntectSourceView {
    fn render(&self, source: &str) -> Result<String, EngineError> {
        highlight_code(&self.language, source, self.syntax_set, &CLASS_STYLE)
            .map_err(|err| EngineError::source_view(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_is_classed_and_escaped() {
        let html = SyntectSourceView::new("rs")
            .render("let s = \"<b>\";")
            .expect("highlight");
        assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-rs\""), "{html}");
        assert!(html.contains("syntax-"), "{html}");
        assert!(html.contains("&lt;b&gt;"), "{html}");
        assert!(!html.contains("<b>"), "{html}");
    }

    #[test]
    fn default_language_has_a_bundled_grammar() {
        let html = SyntectSourceView::new(crate::config::DEFAULT_LANGUAGE)
            .render("fn add(a, b) => a + b // sum")
            .expect("highlight");
        assert!(html.contains("<span class=\"syntax-source syntax-js\">"), "{html}");
        assert!(html.contains("syntax-comment"), "{html}");
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let html = SyntectSourceView::new("no-such-language")
            .render("x = 1")
            .expect("highlight");
        assert!(html.contains("x = 1"), "{html}");
    }

    #[test]
    fn default_theme_has_a_stylesheet() {
        let css = theme_css("InspiredGitHub").expect("css");
        assert!(css.contains(".syntax-"), "{css}");
        assert!(theme_css("missing").is_err());
    }
}
