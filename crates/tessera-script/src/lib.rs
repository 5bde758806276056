//! The snippet language embedded in tessera documents.
//!
//! A small dynamically typed language: [`lexer`] → [`parser`] → [`interpreter`].
//! Anything that reaches outside the interpreter (emitting values, registering
//! renderers, console output) goes through the [`Host`] trait.

pub mod ast;
mod builtins;
pub mod env;
pub mod error;
pub mod figure;
pub mod host;
pub mod interpreter;
pub mod lexer;
mod methods;
mod ops;
pub mod parser;
pub mod stack;
pub mod token;
pub mod value;

pub use error::{ScriptError, ScriptResult};
pub use figure::Figure;
pub use host::{DetachedHost, Host};
pub use interpreter::{Interpreter, MAX_CALL_DEPTH};
pub use ops::MAX_COMPARE_DEPTH;
pub use parser::MAX_NESTING;
pub use stack::{EVAL_STACK_SIZE, on_eval_stack};
pub use value::{BuiltinType, ClassId, TypeRef, TypeTag, Value};
