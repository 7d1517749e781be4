//! Core types for the pollwatch change-detection system
//!
//! This crate provides the pieces shared by every pollwatch crate:
//!
//! - **Configuration**: layered TOML + environment configuration
//! - **Error handling**: unified error types
//!

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, WatcherConfig};
pub use error::{Error, Result, ResultExt};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, WatcherConfig};
    pub use crate::error::{Result, ResultExt};
}
