pub mod application;
pub mod config;
pub mod engine;
pub mod infra;
pub mod presentation;
pub mod util;
