//! HTML document shell around the woven body.

pub mod views;
