use super::{
    block::{self, BlockUnit, PlainSourceView, SourceView},
    environment::{EnvironmentOptions, ExecutionEnvironment},
    error::EngineError,
    inline,
};

/// Owns all engine state for one document run. Dropped when the run ends.
pub struct DocumentSession {
    env: ExecutionEnvironment,
    source_view: Box<dyn SourceView>,
}

impl DocumentSession {
    pub fn new(options: EnvironmentOptions, source_view: Box<dyn SourceView>) -> Self {
        Self {
            env: ExecutionEnvironment::new(options),
            source_view,
        }
    }

    /// A session with default options and unhighlighted source.
    pub fn plain() -> Self {
        Self::new(EnvironmentOptions::default(), Box::new(PlainSourceView))
    }

    pub fn run_block(&mut self, source: &str, info: &str) -> Result<BlockUnit, EngineError> {
        block::run_block(&mut self.env, self.source_view.as_ref(), source, info)
    }

    pub fn evaluate_inline(&mut self, expression: &str) -> Result<String, EngineError> {
        inline::evaluate_inline(&mut self.env, expression)
    }

    pub fn blocks_run(&self) -> u64 {
        self.env.blocks_run()
    }

    pub fn inlines_run(&self) -> u64 {
        self.env.inlines_run()
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
