use metrics::counter;
use tracing::{info, warn};

use super::{environment::ExecutionEnvironment, error::EngineError};

pub(crate) const METRIC_INLINES_TOTAL: &str = "tessera_inline_expressions_total";

/// Evaluate an inline expression and return the plain text of its value.
///
/// Inline results are never dispatched to renderers; anything the expression
/// emits is dropped with a warning.
pub fn evaluate_inline(
    env: &mut ExecutionEnvironment,
    expression: &str,
) -> Result<String, EngineError> {
    let index = env.next_inline();
    info!(inline = index, "Running inline expression {index}");
    counter!(METRIC_INLINES_TOTAL).increment(1);

    let fail = |source| EngineError::Inline {
        index,
        expression: expression.to_string(),
        source,
    };

    env.clear_emissions();
    let value = env.evaluate(expression).map_err(fail)?;
    let stray = env.emissions().len();
    if stray > 0 {
        warn!(
            inline = index,
            count = stray,
            "emissions are ignored in inline expressions"
        );
        env.clear_emissions();
    }

    env.text_of(&value).map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sees_bindings_from_blocks() {
        let mut env = ExecutionEnvironment::default();
        env.run("x = 1").expect("run");
        assert_eq!(evaluate_inline(&mut env, "x").expect("inline"), "1");
        assert_eq!(evaluate_inline(&mut env, "\"a<b\"").expect("inline"), "a<b");
        assert_eq!(env.inlines_run(), 2);
    }

    #[test]
    fn stray_emissions_are_discarded() {
        let mut env = ExecutionEnvironment::default();
        assert_eq!(evaluate_inline(&mut env, "emit(5)").expect("inline"), "nil");
        assert!(env.emissions().is_empty());
    }

    #[test]
    fn failures_name_the_expression() {
        let mut env = ExecutionEnvironment::default();
        let err = evaluate_inline(&mut env, "missing + 1").expect_err("undefined");
        assert!(
            err.to_string()
                .starts_with("inline expression 1 (`missing + 1`) failed"),
            "{err}"
        );
    }
}
