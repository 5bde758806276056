use tessera::application::render::{
    ComrakRenderService, RenderError, RenderOutput, RenderPipelineConfig, RenderRequest,
    RenderService,
};
use tessera::engine::EngineError;
use tessera_script::{MAX_CALL_DEPTH, ScriptError};

fn plain_service() -> ComrakRenderService {
    ComrakRenderService::new(RenderPipelineConfig {
        highlight: false,
        ..RenderPipelineConfig::default()
    })
    .expect("service builds")
}

fn weave(markdown: &str) -> RenderOutput {
    plain_service()
        .render(&RenderRequest::new(markdown))
        .unwrap_or_else(|err| panic!("weave failed: {err}\n{markdown}"))
}

fn weave_err(markdown: &str) -> RenderError {
    plain_service()
        .render(&RenderRequest::new(markdown))
        .expect_err("weave should fail")
}

/// Output region of the `n`th block (0-based).
fn output_of(html: &str, n: usize) -> &str {
    let start = html
        .match_indices("<div class=\"output\">")
        .nth(n)
        .map(|(index, marker)| index + marker.len())
        .expect("block output present");
    let end = html[start..].find("</div></div>").expect("output closes") + start;
    &html[start..end]
}

#[test]
fn title_and_inline_value_come_from_the_shared_namespace() {
    let output = weave("# Title\n\n```\nx = 1\n```\n\n## X is `x`\n");

    assert_eq!(output.title, "Title");
    assert!(output.html.contains("<title>Title</title>"));
    assert!(output.html.contains("<h2>X is 1</h2>"), "{}", output.html);
    assert_eq!(output.block_count, 1);
    assert_eq!(output.inline_count, 1);
}

#[test]
fn document_without_heading_uses_the_default_title() {
    let output = weave("no heading here\n");
    assert_eq!(output.title, "Untitled");

    let custom = ComrakRenderService::new(RenderPipelineConfig {
        highlight: false,
        default_title: "Lab notes".to_string(),
        ..RenderPipelineConfig::default()
    })
    .expect("service builds")
    .render(&RenderRequest::new("prose"))
    .expect("weave");
    assert_eq!(custom.title, "Lab notes");
}

#[test]
fn bindings_persist_across_blocks() {
    let output = weave(
        "```\nfn square(n) => n * n\nbase = 7\n```\n\n\
         text\n\n\
         ```\nemit(square(base))\n```\n",
    );
    assert_eq!(output_of(&output.html, 0), "");
    assert_eq!(output_of(&output.html, 1), "<pre>49</pre>");
}

#[test]
fn single_emission_is_not_wrapped() {
    let output = weave("```\nemit(\"hello\", \"Greeting\")\n```\n");
    assert_eq!(output_of(&output.html, 0), "<p>hello</p>");
}

#[test]
fn named_emissions_fold_into_collapsed_sections_in_order() {
    let output = weave("```\nemit(\"a\", \"A\")\nemit(\"b\", \"B\")\n```\n");
    assert_eq!(
        output_of(&output.html, 0),
        "<details><summary>A</summary><p>a</p></details>\
         <details><summary>B</summary><p>b</p></details>"
    );
    assert!(!output.html.contains("<details open"));
}

#[test]
fn default_names_restart_in_every_block() {
    let output = weave("```\nemit(1)\nemit(2)\n```\n\n```\nemit(3)\nemit(4)\n```\n");
    for block in 0..2 {
        let html = output_of(&output.html, block);
        assert!(html.contains("<summary>Output 1</summary>"), "{html}");
        assert!(html.contains("<summary>Output 2</summary>"), "{html}");
        assert!(!html.contains("Output 3"), "{html}");
    }
}

#[test]
fn markup_in_emitted_text_is_escaped() {
    let output = weave("```\nemit(\"<script>alert('x') & \\\"y\\\"</script>\")\n```\n");
    assert_eq!(
        output_of(&output.html, 0),
        "<p>&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;</p>"
    );
}

#[test]
fn values_without_a_renderer_use_the_preformatted_fallback() {
    let output = weave("```\nemit({\"k\": [1, 2.5, nil]})\n```\n");
    assert_eq!(
        output_of(&output.html, 0),
        "<pre>{&quot;k&quot;: [1, 2.5, nil]}</pre>"
    );
}

#[test]
fn subclasses_use_the_nearest_registered_renderer() {
    let output = weave(
        r#"```
class Shape {}
class Circle(Shape) {}
class Dot(Circle) {}
renderer(Shape, fn(s) => "<em>shape</em>")
renderer(Circle, fn(c) => "<em>circle</em>")
emit(Shape(), "s")
emit(Dot(), "d")
```
"#,
    );
    let html = output_of(&output.html, 0);
    assert!(html.contains("<summary>s</summary><em>shape</em>"), "{html}");
    assert!(html.contains("<summary>d</summary><em>circle</em>"), "{html}");
}

#[test]
fn render_override_beats_any_registration() {
    let output = weave(
        r#"```
class Badge {
  fn __init__(self, label) { self.label = label }
  fn __html__(self) => "<span class=\"badge\">" + self.label + "</span>"
}
renderer(Badge, fn(b) => "<b>registered</b>")
emit(Badge("ok"))
```
"#,
    );
    assert_eq!(
        output_of(&output.html, 0),
        "<span class=\"badge\">ok</span>"
    );
}

#[test]
fn builtin_types_accept_script_renderers() {
    let output = weave(
        "```\nrenderer(int, fn(n) => \"<i>\" + str(n) + \"</i>\")\nemit(5, \"n\")\nemit(true, \"b\")\n```\n",
    );
    let html = output_of(&output.html, 0);
    assert!(html.contains("<summary>n</summary><i>5</i>"), "{html}");
    assert!(html.contains("<summary>b</summary><i>true</i>"), "{html}");
}

#[test]
fn registrations_outlive_the_block_that_made_them() {
    let output = weave(
        "```\nrenderer(float, fn(x) => \"<code>\" + str(round(x, 1)) + \"</code>\")\n```\n\n\
         ```\nemit(3.14159)\n```\n",
    );
    assert_eq!(output_of(&output.html, 1), "<code>3.1</code>");
}

#[test]
fn inline_results_are_plain_text_and_stray_emissions_are_dropped() {
    let output = weave("```\ns = \"<b>bold</b>\"\n```\n\nvalue: `s` and `emit(1)`\n");
    assert!(
        output
            .html
            .contains("value: &lt;b&gt;bold&lt;/b&gt; and nil"),
        "{}",
        output.html
    );
    assert_eq!(output.inline_count, 2);
}

#[test]
fn snippets_see_pass_through_arguments() {
    let output = plain_service()
        .render(&RenderRequest::new("```\nemit(len(argv))\n```\n\n`argv[0]`\n").with_argv(["north", "7"]))
        .expect("weave");
    assert_eq!(output_of(&output.html, 0), "<pre>2</pre>");
    assert!(output.html.contains("<p>north</p>"), "{}", output.html);
}

#[test]
fn unknown_flags_do_not_stop_the_block() {
    let output = weave("```bogus extra\nemit(\"ran\")\n```\n");
    assert_eq!(output_of(&output.html, 0), "<p>ran</p>");
}

#[cfg(feature = "plot")]
#[test]
fn plot_flag_emits_the_current_figure() {
    let output = weave("```plot bogus\nplot([1, 4, 9])\ntitle(\"squares\")\n```\n");
    let html = output_of(&output.html, 0);
    assert!(html.starts_with("<img src=\"data:image/png;base64,"), "{html}");
    assert!(html.contains("alt=\"squares\""), "{html}");
}

#[cfg(feature = "plot")]
#[test]
fn plot_flag_adds_to_explicit_emissions() {
    let output = weave("```plot\nemit(\"before\", \"note\")\nscatter([1, 2], [3, 4])\n```\n");
    let html = output_of(&output.html, 0);
    assert!(html.starts_with("<details><summary>note</summary><p>before</p></details>"), "{html}");
    assert!(html.contains("<details><summary>Output 2</summary><img"), "{html}");
}

#[cfg(not(feature = "plot"))]
#[test]
fn plot_flag_without_plotting_support_is_fatal() {
    let err = weave_err("```plot bogus\nx = 1\n```\n");
    assert!(
        matches!(
            &err,
            RenderError::Engine(EngineError::Block { block: 1, source })
                if matches!(source.root(), ScriptError::Unavailable(_))
        ),
        "{err}"
    );
}

#[test]
fn failing_block_aborts_the_whole_document() {
    let err = weave_err("# Report\n\n```\nok = 1\n```\n\n```\nemit(ok)\nmissing()\n```\n\n`ok`\n");
    match err {
        RenderError::Engine(EngineError::Block { block, source }) => {
            assert_eq!(block, 2);
            assert!(matches!(source.root(), ScriptError::UndefinedName(name) if name == "missing"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_inline_expression_aborts_the_whole_document() {
    let err = weave_err("`1 / 0`\n");
    assert!(
        matches!(
            &err,
            RenderError::Engine(EngineError::Inline { index: 1, expression, .. })
                if expression == "1 / 0"
        ),
        "{err}"
    );
}

#[test]
fn failing_renderer_is_fatal() {
    let err = weave_err("```\nclass Bad { fn __html__(self) => nope }\nemit(Bad())\n```\n");
    assert!(matches!(err, RenderError::Engine(EngineError::Block { block: 1, .. })), "{err}");
}

#[test]
fn separate_documents_do_not_share_state() {
    let service = plain_service();
    service
        .render(&RenderRequest::new("```\nleak = 1\n```\n"))
        .expect("first document");
    let err = service
        .render(&RenderRequest::new("`leak`\n"))
        .expect_err("second document must not see `leak`");
    assert!(matches!(err, RenderError::Engine(EngineError::Inline { .. })), "{err}");
}

#[test]
fn highlighted_sources_carry_theme_classes() {
    let service = ComrakRenderService::new(RenderPipelineConfig::default()).expect("service builds");
    let output = service
        .render(&RenderRequest::new("```\nlet answer = 42\n```\n"))
        .expect("weave");
    assert!(output.html.contains("<div class=\"source\"><pre class=\"syntax-highlight"), "{}", output.html);
    assert!(output.html.contains(".syntax-"), "theme stylesheet missing");
}

#[test]
fn math_switches_on_the_mathjax_include() {
    let output = weave("Area: $\\pi r^2$\n");
    assert!(output.contains_math);
    assert!(output.html.contains("\\(\\pi r^2\\)"), "{}", output.html);
    assert!(output.html.contains("mathjax"), "{}", output.html);

    let output = weave("No math.\n");
    assert!(!output.html.contains("mathjax"));
}

const COUNTDOWN: &str = "fn f(n) {\n  if n == 0 { return 0 }\n  return 1 + f(n - 1)\n}\n";

#[test]
fn recursion_to_the_call_limit_works_from_any_thread() {
    let deepest = MAX_CALL_DEPTH - 1;
    let output = weave(&format!("```\n{COUNTDOWN}emit(f({deepest}))\n```\n"));
    assert_eq!(output_of(&output.html, 0), format!("<pre>{deepest}</pre>"));

    let err = weave_err(&format!("```\n{COUNTDOWN}emit(f({MAX_CALL_DEPTH}))\n```\n"));
    assert!(
        matches!(
            &err,
            RenderError::Engine(EngineError::Block { block: 1, source })
                if matches!(source.root(), ScriptError::Recursion(MAX_CALL_DEPTH))
        ),
        "{err}"
    );
}

#[test]
fn comparing_cyclic_lists_is_a_block_error() {
    let err = weave_err("```\na = []\nb = []\na.push(b)\nb.push(a)\nemit(a == b)\n```\n");
    match err {
        RenderError::Engine(EngineError::Block { block, source }) => {
            assert_eq!(block, 1);
            assert_eq!(source.root().to_string(), "value error: comparison too deeply nested");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn deeply_nested_source_is_a_syntax_error() {
    let nested = format!("{}1{}", "[".repeat(50_000), "]".repeat(50_000));
    let err = weave_err(&format!("```\nx = {nested}\n```\n"));
    assert!(
        matches!(
            &err,
            RenderError::Engine(EngineError::Block { source, .. })
                if matches!(source.root(), ScriptError::Syntax { .. })
        ),
        "{err}"
    );
}
