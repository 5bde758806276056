//! Type-keyed renderer table.
//!
//! Entries are keyed by [`TypeTag`]; a lookup walks the value's ancestry from
//! its own type up to `object`, so the `object` fallback only answers when no
//! more specific handler is bound anywhere on the chain.

#[cfg(feature = "plot")]
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tessera_script::{BuiltinType, Host, Interpreter, ScriptResult, TypeRef, TypeTag, Value};

use crate::util::html::escape;

/// A handler implemented in Rust.
pub type NativeRenderer = fn(&mut Interpreter, &mut dyn Host, &Value) -> ScriptResult<String>;

/// One bound handler: native, or a script callable taking the value.
#[derive(Debug, Clone)]
pub enum Renderer {
    Native(NativeRenderer),
    Script(Value),
}

impl Renderer {
    pub fn invoke(
        &self,
        interp: &mut Interpreter,
        host: &mut dyn Host,
        value: &Value,
    ) -> ScriptResult<String> {
        match self {
            Renderer::Native(render) => render(interp, host, value),
            Renderer::Script(handler) => {
                let result = interp.call(handler, vec![value.clone()], host)?;
                interp.to_str(&result, host)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RendererRegistry {
    entries: Vec<(TypeTag, Renderer)>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    /// A registry holding the built-in handlers: the `object` fallback, `str`,
    /// and `figure` when plotting is compiled in.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.register(&TypeRef::OBJECT, Renderer::Native(render_fallback));
        registry.register(
            &TypeRef::Builtin(BuiltinType::Str),
            Renderer::Native(render_text),
        );
        #[cfg(feature = "plot")]
        registry.register(
            &TypeRef::Builtin(BuiltinType::Figure),
            Renderer::Native(render_figure),
        );
        registry
    }

    /// Bind `renderer` to exactly `ty`, replacing any earlier binding in place.
    pub fn register(&mut self, ty: &TypeRef, renderer: Renderer) {
        let tag = ty.tag();
        match self.entries.iter_mut().find(|(bound, _)| *bound == tag) {
            Some(entry) => entry.1 = renderer,
            None => self.entries.push((tag, renderer)),
        }
    }

    /// The handler bound to the nearest type on `ty`'s ancestry.
    pub fn lookup(&self, ty: &TypeRef) -> Renderer {
        ty.ancestry()
            .iter()
            .find_map(|candidate| self.bound(candidate.tag()))
            .cloned()
            .unwrap_or(Renderer::Native(render_fallback))
    }

    fn bound(&self, tag: TypeTag) -> Option<&Renderer> {
        self.entries
            .iter()
            .find(|(bound, _)| *bound == tag)
            .map(|(_, renderer)| renderer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn render_text(interp: &mut Interpreter, host: &mut dyn Host, value: &Value) -> ScriptResult<String> {
    let text = interp.to_str(value, host)?;
    Ok(format!("<p>{}</p>", escape(&text)))
}

fn render_fallback(
    interp: &mut Interpreter,
    host: &mut dyn Host,
    value: &Value,
) -> ScriptResult<String> {
    let text = interp.repr(value, host)?;
    Ok(format!("<pre>{}</pre>", escape(&text)))
}

#[cfg(feature = "plot")]
fn render_figure(
    interp: &mut Interpreter,
    host: &mut dyn Host,
    value: &Value,
) -> ScriptResult<String> {
    let Value::Figure(figure) = value else {
        return render_fallback(interp, host, value);
    };
    let figure = figure.borrow();
    let png = figure.to_png()?;
    let alt = figure
        .title
        .as_deref()
        .map(|title| format!(" alt=\"{}\"", escape(title)))
        .unwrap_or_default();
    Ok(format!(
        "<img src=\"data:image/png;base64,{}\"{alt} />",
        STANDARD.encode(png)
    ))
}

#[cfg(test)]
mod tests {
    use tessera_script::DetachedHost;

    use super::*;

    fn render(registry: &RendererRegistry, interp: &mut Interpreter, value: &Value) -> String {
        registry
            .lookup(&value.type_ref())
            .invoke(interp, &mut DetachedHost, value)
            .expect("render")
    }

    #[test]
    fn text_is_escaped_into_a_paragraph() {
        let registry = RendererRegistry::new();
        let mut interp = Interpreter::new();
        assert_eq!(
            render(&registry, &mut interp, &Value::str("a < b & \"c\"")),
            "<p>a &lt; b &amp; &quot;c&quot;</p>"
        );
    }

    #[test]
    fn other_values_fall_back_to_preformatted_repr() {
        let registry = RendererRegistry::new();
        let mut interp = Interpreter::new();
        let value = Value::list(vec![Value::Int(1), Value::str("<x>")]);
        assert_eq!(
            render(&registry, &mut interp, &value),
            "<pre>[1, &quot;&lt;x&gt;&quot;]</pre>"
        );
    }

    #[test]
    fn registering_twice_replaces_in_place() {
        let mut registry = RendererRegistry::new();
        let before = registry.len();
        let int = TypeRef::Builtin(BuiltinType::Int);
        registry.register(&int, Renderer::Native(render_text));
        registry.register(&int, Renderer::Native(render_fallback));
        assert_eq!(registry.len(), before + 1);

        let mut interp = Interpreter::new();
        assert_eq!(render(&registry, &mut interp, &Value::Int(3)), "<pre>3</pre>");
    }

    #[test]
    fn bool_inherits_the_int_handler() {
        let mut registry = RendererRegistry::new();
        registry.register(
            &TypeRef::Builtin(BuiltinType::Int),
            Renderer::Native(render_text),
        );
        let mut interp = Interpreter::new();
        assert_eq!(
            render(&registry, &mut interp, &Value::Bool(true)),
            "<p>true</p>"
        );
    }

    #[cfg(feature = "plot")]
    #[test]
    fn figures_embed_a_png_data_uri() {
        let registry = RendererRegistry::new();
        let mut interp = Interpreter::new();
        interp.set_figure_size(64, 48);
        let figure = interp.current_figure().expect("figure");
        figure.borrow_mut().title = Some("a \"b\"".to_string());
        let html = render(&registry, &mut interp, &Value::Figure(figure));
        assert!(html.starts_with("<img src=\"data:image/png;base64,iVBORw0KGgo"), "{html}");
        assert!(html.ends_with(" alt=\"a &quot;b&quot;\" />"), "{html}");
    }
}
