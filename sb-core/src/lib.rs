//! simbook core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other simbook
//! crates:
//! - Global error types covering all error categories
//! - TOML application configuration
//! - Structured logging with tracing
//! - Common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{SbError, SbResult};
pub use logging::init_logging;
