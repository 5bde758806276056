use tessera_script::ScriptError;
use thiserror::Error;

/// Failures raised while weaving a document. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("block {block} failed: {source}")]
    Block {
        block: u64,
        #[source]
        source: ScriptError,
    },
    #[error("inline expression {index} (`{expression}`) failed: {source}")]
    Inline {
        index: u64,
        expression: String,
        #[source]
        source: ScriptError,
    },
    #[error("source view failed: {message}")]
    SourceView { message: String },
}

impl EngineError {
    pub fn source_view(message: impl Into<String>) -> Self {
        Self::SourceView {
            message: message.into(),
        }
    }
}
