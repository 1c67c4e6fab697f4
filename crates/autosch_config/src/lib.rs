//! Parsing and validation of `autosch.toml` engine configuration files.
//!
//! Every section and every key is optional; missing values fall back to the
//! engine defaults, so an empty file (or no file at all) yields
//! [`EngineConfig::default()`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
