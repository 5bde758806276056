use tessera_script::{Host as _, Interpreter, ScriptResult, Value};

use super::{context::ExecutionContext, emission::Emission, registry::RendererRegistry};

/// Options fixed for the lifetime of one document run.
#[derive(Debug, Clone)]
pub struct EnvironmentOptions {
    /// Pass-through arguments exposed to snippets as `argv`.
    pub argv: Vec<String>,
    /// Size of figures created without explicit dimensions.
    pub figure_size: (u32, u32),
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            argv: Vec::new(),
            figure_size: (
                tessera_script::figure::DEFAULT_WIDTH,
                tessera_script::figure::DEFAULT_HEIGHT,
            ),
        }
    }
}

/// The persistent namespace every block and inline expression of a document
/// runs against, plus the execution context bound to it and the progress
/// counters.
#[derive(Debug)]
pub struct ExecutionEnvironment {
    interpreter: Interpreter,
    context: ExecutionContext,
    blocks_run: u64,
    inlines_run: u64,
}

impl Default for ExecutionEnvironment {
    fn default() -> Self {
        Self::new(EnvironmentOptions::default())
    }
}

impl ExecutionEnvironment {
    pub fn new(options: EnvironmentOptions) -> Self {
        let mut interpreter = Interpreter::new();
        interpreter.set_argv(&options.argv);
        interpreter.set_figure_size(options.figure_size.0, options.figure_size.1);
        Self {
            interpreter,
            context: ExecutionContext::new(RendererRegistry::new()),
            blocks_run: 0,
            inlines_run: 0,
        }
    }

    /// Execute a snippet in place; bindings it makes stay visible to later calls.
    pub fn run(&mut self, source: &str) -> ScriptResult<()> {
        self.interpreter.run(source, &mut self.context)
    }

    pub fn evaluate(&mut self, expression: &str) -> ScriptResult<Value> {
        self.interpreter.evaluate(expression, &mut self.context)
    }

    /// Render `value` into the emission registry, as a snippet's `emit` would.
    pub fn emit(&mut self, value: Value, name: Option<String>) -> ScriptResult<()> {
        self.context.emit(&mut self.interpreter, value, name)
    }

    /// Emit the current figure; fails when plotting is unavailable.
    pub fn emit_current_figure(&mut self) -> ScriptResult<()> {
        let figure = self.interpreter.current_figure()?;
        self.emit(Value::Figure(figure), None)
    }

    /// The `str()` form of a value, hooks included.
    pub fn text_of(&mut self, value: &Value) -> ScriptResult<String> {
        self.interpreter.to_str(value, &mut self.context)
    }

    pub fn clear_emissions(&mut self) {
        self.context.clear_emissions();
    }

    pub fn emissions(&self) -> &[Emission] {
        self.context.emissions().items()
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.interpreter.global(name)
    }

    /// Advance and return the block counter.
    pub fn next_block(&mut self) -> u64 {
        self.blocks_run += 1;
        self.blocks_run
    }

    /// Advance and return the inline-expression counter.
    pub fn next_inline(&mut self) -> u64 {
        self.inlines_run += 1;
        self.inlines_run
    }

    pub fn blocks_run(&self) -> u64 {
        self.blocks_run
    }

    pub fn inlines_run(&self) -> u64 {
        self.inlines_run
    }
}
