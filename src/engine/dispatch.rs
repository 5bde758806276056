//! Value → HTML fragment dispatch.
//!
//! A value whose class defines [`RENDER_OVERRIDE_METHOD`] renders itself and
//! the registry is never consulted; everything else goes through
//! [`RendererRegistry::lookup`]. The handler is resolved (and cloned) before it
//! runs, so a handler that registers renderers cannot change the dispatch it
//! is part of.

use tessera_script::{Host, Interpreter, ScriptResult, Value};

use super::registry::{Renderer, RendererRegistry};

/// Zero-argument method an object defines to supply its own HTML.
pub const RENDER_OVERRIDE_METHOD: &str = "__html__";

#[derive(Debug, Clone)]
pub enum Resolution {
    /// Bound `__html__` method of the value.
    Override(Value),
    Registered(Renderer),
}

pub fn resolve(registry: &RendererRegistry, interp: &Interpreter, value: &Value) -> Resolution {
    match interp.method(value, RENDER_OVERRIDE_METHOD) {
        Some(method) => Resolution::Override(method),
        None => Resolution::Registered(registry.lookup(&value.type_ref())),
    }
}

impl Resolution {
    pub fn invoke(
        &self,
        interp: &mut Interpreter,
        host: &mut dyn Host,
        value: &Value,
    ) -> ScriptResult<String> {
        match self {
            Resolution::Override(method) => {
                let result = interp.call(method, Vec::new(), host)?;
                interp.to_str(&result, host)
            }
            Resolution::Registered(renderer) => renderer.invoke(interp, host, value),
        }
    }
}

/// Resolve and invoke in one step.
pub fn render(
    registry: &RendererRegistry,
    interp: &mut Interpreter,
    host: &mut dyn Host,
    value: &Value,
) -> ScriptResult<String> {
    resolve(registry, interp, value).invoke(interp, host, value)
}

#[cfg(test)]
mod tests {
    use tessera_script::DetachedHost;

    use super::*;

    #[test]
    fn override_beats_a_registered_handler() {
        let mut interp = Interpreter::new();
        interp
            .run(
                r#"
class Card {
  fn __html__(self) => "<section>card</section>"
}
card = Card()
"#,
                &mut DetachedHost,
            )
            .expect("define class");
        let card = interp.global("card").expect("card bound");

        let mut registry = RendererRegistry::new();
        registry.register(
            &card.type_ref(),
            Renderer::Native(|_, _, _| Ok("<b>registered</b>".to_string())),
        );

        assert!(matches!(
            resolve(&registry, &interp, &card),
            Resolution::Override(_)
        ));
        let html = render(&registry, &mut interp, &mut DetachedHost, &card).expect("render");
        assert_eq!(html, "<section>card</section>");
    }

    #[test]
    fn non_string_override_results_use_their_text_form() {
        let mut interp = Interpreter::new();
        interp
            .run(
                "class Answer { fn __html__(self) => 42 }\nanswer = Answer()",
                &mut DetachedHost,
            )
            .expect("define class");
        let answer = interp.global("answer").expect("answer bound");
        let html = render(
            &RendererRegistry::new(),
            &mut interp,
            &mut DetachedHost,
            &answer,
        )
        .expect("render");
        assert_eq!(html, "42");
    }

    #[test]
    fn builtin_values_have_no_override() {
        let interp = Interpreter::new();
        let resolution = resolve(&RendererRegistry::new(), &interp, &Value::Int(1));
        assert!(matches!(resolution, Resolution::Registered(_)));
    }
}
