//! Configuration validation for model and dataset settings.

pub mod errors;

pub use errors::{ConfigError, ConfigValidator};
