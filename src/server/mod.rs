//! HTTP server for Sanctum

pub mod http;

pub use http::{run, AppState};
