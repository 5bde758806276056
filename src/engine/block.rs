//! Running one code block: flags → reset → execute → implicit emit → fold → assemble.

use metrics::counter;
use tracing::{info, warn};

use super::{emission::Emission, environment::ExecutionEnvironment, error::EngineError};
use crate::util::html::escape;

pub(crate) const METRIC_BLOCKS_TOTAL: &str = "tessera_blocks_run_total";

/// Flags parsed from a code block's info string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFlags {
    /// Emit the current figure after the block runs.
    pub plot: bool,
    /// Tokens that matched no known flag.
    pub unknown: Vec<String>,
}

impl BlockFlags {
    pub fn parse(info: &str) -> Self {
        let mut flags = Self::default();
        for token in info.split_whitespace() {
            match token {
                "plot" => flags.plot = true,
                other => flags.unknown.push(other.to_string()),
            }
        }
        flags
    }
}

/// Turns block source into the markup shown in the source region.
pub trait SourceView {
    fn render(&self, source: &str) -> Result<String, EngineError>;
}

/// Escaped source in `<pre><code>`, no highlighting.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainSourceView;

impl SourceView for PlainSourceView {
    fn render(&self, source: &str) -> Result<String, EngineError> {
        Ok(format!("<pre><code>{}</code></pre>", escape(source)))
    }
}

/// Source and output of one block, bound together for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUnit {
    pub source_html: String,
    pub output_html: String,
}

impl BlockUnit {
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"codeblock\"><div class=\"source\">{}</div><div class=\"output\">{}</div></div>",
            self.source_html, self.output_html
        )
    }
}

/// No emissions → empty; one → its fragment as is; several → one collapsed
/// `<details>` per emission, in order.
pub fn fold_output(emissions: &[Emission]) -> String {
    match emissions {
        [] => String::new(),
        [only] => only.fragment.clone(),
        many => many
            .iter()
            .map(|emission| {
                format!(
                    "<details><summary>{}</summary>{}</details>",
                    escape(&emission.name),
                    emission.fragment
                )
            })
            .collect(),
    }
}

/// Run one block against the shared environment and assemble its display unit.
pub fn run_block(
    env: &mut ExecutionEnvironment,
    view: &dyn SourceView,
    source: &str,
    info: &str,
) -> Result<BlockUnit, EngineError> {
    let flags = BlockFlags::parse(info);
    for flag in &flags.unknown {
        warn!(flag = %flag, "ignoring unknown block flag `{flag}`");
    }

    env.clear_emissions();

    let block = env.next_block();
    info!(block, "Running block {block}");
    counter!(METRIC_BLOCKS_TOTAL).increment(1);
    env.run(source)
        .map_err(|source| EngineError::Block { block, source })?;

    if flags.plot {
        env.emit_current_figure()
            .map_err(|source| EngineError::Block { block, source })?;
    }

    let output_html = fold_output(env.emissions());
    let source_html = view.render(source)?;
    Ok(BlockUnit {
        source_html,
        output_html,
    })
}
