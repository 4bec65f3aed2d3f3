//! CRM Core Library
//!
//! Domain models, error types and configuration shared by every CRM crate.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, EnvSource, LogFormat, MapSource, ParameterSource, StoreBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
