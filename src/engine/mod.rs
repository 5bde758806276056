//! Execution-and-rendering engine.
//!
//! A [`DocumentSession`] owns one [`ExecutionEnvironment`] for a whole
//! document. Blocks run in document order against it through
//! [`block::run_block`]; inline expressions through
//! [`inline::evaluate_inline`]. Values emitted by a block are rendered by
//! [`dispatch`] using the [`RendererRegistry`] and folded into its output.

pub mod block;
pub mod context;
pub mod dispatch;
pub mod emission;
pub mod environment;
pub mod error;
pub mod inline;
pub mod registry;
pub mod session;

pub use block::{BlockFlags, BlockUnit, PlainSourceView, SourceView, fold_output};
pub use context::ExecutionContext;
pub use dispatch::RENDER_OVERRIDE_METHOD;
pub use emission::{Emission, EmissionRegistry};
pub use environment::{EnvironmentOptions, ExecutionEnvironment};
pub use error::EngineError;
pub use registry::{NativeRenderer, Renderer, RendererRegistry};
pub use session::DocumentSession;
