//! # pylon-config
//!
//! Configuration system for Pylon. Reads from `pylon.toml` and applies
//! environment variable overrides on top of it.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::PylonConfig;
pub use schema::{
    ConfigWarning, LoggingConfig, PathsConfig, PluginsConfig, TrustedKey, UpdatesConfig,
    WarningSeverity,
};
