//! AST rewrite: runs every code block and inline code span through the
//! document session, in document order, and replaces each with its result.

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};

use crate::application::render::types::RenderError;
use crate::engine::DocumentSession;

use super::math;

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    /// Normalised text of the first heading, after inline evaluation.
    pub(crate) title: Option<String>,
    pub(crate) contains_math: bool,
}

pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    session: &mut DocumentSession,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker {
        session,
        outcome: RewriteOutcome::default(),
    };
    walker.visit_nodes(root)?;
    let mut outcome = walker.outcome;
    outcome.title = first_heading_text(root);
    Ok(outcome)
}

struct RewriteWalker<'s> {
    session: &'s mut DocumentSession,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_> {
    fn visit_nodes(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        if let Some((info, literal)) = extract_code_block(node) {
            let unit = self.session.run_block(&literal, &info)?;
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: unit.to_html(),
            });
        } else if let Some(expression) = extract_inline_code(node) {
            let text = self.session.evaluate_inline(&expression)?;
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::Text(text.into());
        } else if let Some((literal, display_mode)) = extract_math(node) {
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlInline(math::render_math_html(&literal, display_mode));
            self.outcome.contains_math = true;
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

fn extract_inline_code(node: &AstNode<'_>) -> Option<String> {
    let data = node.data.borrow();
    if let NodeValue::Code(code) = &data.value {
        Some(code.literal.clone())
    } else {
        None
    }
}

fn extract_math(node: &AstNode<'_>) -> Option<(String, bool)> {
    let data = node.data.borrow();
    if let NodeValue::Math(math) = &data.value {
        Some((math.literal.clone(), math.display_math))
    } else {
        None
    }
}

fn first_heading_text<'a>(root: &'a AstNode<'a>) -> Option<String> {
    let heading = root
        .descendants()
        .find(|node| matches!(node.data.borrow().value, NodeValue::Heading(_)))?;
    let text = collect_inline_text(heading);
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalized.is_empty()).then_some(normalized)
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::Math(math) => buffer.push_str(&math.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html, parse_document};

    use super::*;
    use crate::application::render::service::config::default_options;

    fn rewrite(markdown: &str) -> (RewriteOutcome, String, DocumentSession) {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let mut session = DocumentSession::plain();
        let outcome = rewrite_ast(root, &mut session).expect("rewrite");
        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        (outcome, html, session)
    }

    #[test]
    fn code_blocks_become_display_units() {
        let (_, html, session) = rewrite("```\nemit(\"hi\")\n```\n");
        assert!(html.contains("<div class=\"codeblock\">"), "{html}");
        assert!(html.contains("<div class=\"output\"><p>hi</p></div>"), "{html}");
        assert_eq!(session.blocks_run(), 1);
    }

    #[test]
    fn inline_code_is_replaced_by_escaped_text() {
        let (_, html, session) = rewrite("```\ns = \"<i>\"\n```\n\nvalue: `s`\n");
        assert!(html.contains("value: &lt;i&gt;"), "{html}");
        assert_eq!(session.inlines_run(), 1);
    }

    #[test]
    fn title_uses_the_first_heading_after_evaluation() {
        let (outcome, _, _) = rewrite("```\nn = 3\n```\n\n# Run  `n`\n\n## Later\n");
        assert_eq!(outcome.title.as_deref(), Some("Run 3"));
    }

    #[test]
    fn no_heading_means_no_title() {
        let (outcome, _, _) = rewrite("just prose\n");
        assert!(outcome.title.is_none());
    }

    #[test]
    fn math_is_handed_to_mathjax() {
        let (outcome, html, _) = rewrite("Euler: $e^{i\\pi} + 1 = 0$\n");
        assert!(outcome.contains_math);
        assert!(html.contains("\\(e^{i\\pi} + 1 = 0\\)"), "{html}");
    }

    #[test]
    fn blocks_and_inline_expressions_run_in_document_order() {
        let (_, html, _) = rewrite("```\nx = 1\n```\n\n`x`\n\n```\nx = 2\n```\n\n`x`\n");
        let first = html.find("<p>1</p>").expect("first inline");
        let second = html.find("<p>2</p>").expect("second inline");
        assert!(first < second, "{html}");
    }
}
