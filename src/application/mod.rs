//! Application services: the weaving pipeline and its error type.

pub mod error;
pub mod render;
pub mod weave;
