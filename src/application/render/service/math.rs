use crate::util::html::escape;

/// Wrap a math literal in MathJax delimiters: `\(…\)` inline, `\[…\]` display.
pub(crate) fn render_math_html(literal: &str, display_mode: bool) -> String {
    let (open, close) = if display_mode {
        ("\\[", "\\]")
    } else {
        ("\\(", "\\)")
    };
    let style = if display_mode { "display" } else { "inline" };
    format!(
        "<span class=\"math\" data-math-style=\"{style}\">{open}{}{close}</span>",
        escape(literal)
    )
}

#[cfg(test)]
mod tests {
    use super::render_math_html;

    #[test]
    fn delimiters_follow_display_mode() {
        assert_eq!(
            render_math_html("a < b", false),
            "<span class=\"math\" data-math-style=\"inline\">\\(a &lt; b\\)</span>"
        );
        assert!(render_math_html("x^2", true).contains("\\[x^2\\]"));
    }
}
