//! Common utilities shared across the identity services.
//!
//! This crate provides:
//! - Unified error handling with gRPC status mapping
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, ErrorKind, OptionExt};
