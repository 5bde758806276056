use metrics::counter;
use tessera_script::{Host, Interpreter, ScriptResult, TypeRef, Value};
use tracing::debug;

use super::{
    dispatch,
    emission::EmissionRegistry,
    registry::{Renderer, RendererRegistry},
};

pub(crate) const METRIC_EMISSIONS_TOTAL: &str = "tessera_emissions_total";

/// The single host a document run hands to the interpreter: `emit` renders
/// into the shared [`EmissionRegistry`], `renderer` binds into the shared
/// [`RendererRegistry`].
#[derive(Debug, Default)]
pub struct ExecutionContext {
    renderers: RendererRegistry,
    emissions: EmissionRegistry,
}

impl ExecutionContext {
    pub fn new(renderers: RendererRegistry) -> Self {
        Self {
            renderers,
            emissions: EmissionRegistry::default(),
        }
    }

    pub fn emissions(&self) -> &EmissionRegistry {
        &self.emissions
    }

    pub fn clear_emissions(&mut self) {
        self.emissions.clear();
    }
}

impl Host for ExecutionContext {
    fn emit(
        &mut self,
        interp: &mut Interpreter,
        value: Value,
        name: Option<String>,
    ) -> ScriptResult<()> {
        let name = name.unwrap_or_else(|| self.emissions.default_name());
        let resolution = dispatch::resolve(&self.renderers, interp, &value);
        let fragment = resolution.invoke(interp, self, &value)?;
        debug!(name = %name, bytes = fragment.len(), "emission rendered");
        self.emissions.push(name, fragment);
        counter!(METRIC_EMISSIONS_TOTAL).increment(1);
        Ok(())
    }

    fn register_renderer(&mut self, ty: TypeRef, handler: Value) -> ScriptResult<()> {
        debug!(ty = ty.name(), "script renderer registered");
        self.renderers.register(&ty, Renderer::Script(handler));
        Ok(())
    }
}
