//! The boundary between the interpreter and whoever embeds it.

use crate::error::{ScriptError, ScriptResult};
use crate::interpreter::Interpreter;
use crate::value::{TypeRef, Value};

/// Capabilities a snippet reaches through builtins but the interpreter does
/// not own: collecting emitted values, registering renderers, console output.
pub trait Host {
    /// Called by `emit(value, name?)`.
    fn emit(
        &mut self,
        interp: &mut Interpreter,
        value: Value,
        name: Option<String>,
    ) -> ScriptResult<()>;

    /// Called by `renderer(T, handler)`.
    fn register_renderer(&mut self, ty: TypeRef, handler: Value) -> ScriptResult<()>;

    /// One line of `print` output.
    fn print(&mut self, line: &str) {
        eprintln!("{line}");
    }
}

/// A host with no document attached: printing works, emitting does not.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedHost;

impl Host for DetachedHost {
    fn emit(&mut self, _: &mut Interpreter, _: Value, _: Option<String>) -> ScriptResult<()> {
        Err(ScriptError::unavailable(
            "`emit` needs an execution context",
        ))
    }

    fn register_renderer(&mut self, _: TypeRef, _: Value) -> ScriptResult<()> {
        Err(ScriptError::unavailable(
            "`renderer` needs an execution context",
        ))
    }
}
