//! Shared types for Sanctum

pub mod error;

pub use error::{Result, SanctumError};
