use comrak::options::{ListStyleType, Options};

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.math_dollars = true;
    ext.underline = true;
    ext.subscript = true;

    let render = &mut options.render;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use comrak::markdown_to_html;

    use super::*;

    #[test]
    fn raw_html_and_tables_pass_through() {
        let options = default_options();
        let html = markdown_to_html("<aside>note</aside>\n\n| a |\n|---|\n| 1 |\n", &options);
        assert!(html.contains("<aside>note</aside>"), "{html}");
        assert!(html.contains("<table>"), "{html}");
    }
}
