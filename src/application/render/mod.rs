//! Document rendering: markdown in, one self-contained HTML document out.
//!
//! Each [`RenderService::render`] call owns a fresh engine session, so blocks
//! of one document share state and separate documents never do.

mod service;
mod types;

pub use service::{ComrakRenderService, RenderPipelineConfig, SyntectSourceView};
pub(crate) use service::METRIC_DOCUMENTS_TOTAL;
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService};
