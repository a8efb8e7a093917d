//! # pylon-cli
//!
//! Command-line interface for the Pylon plugin host.
//!
//! ## Commands
//!
//! - `pylon scan`: Discover plugins and print what was registered
//! - `pylon info <id>`: Show one registered plugin
//! - `pylon routes`: List static asset routes
//! - `pylon errors`: List rejected plugins and load faults
//! - `pylon config`: Show the effective configuration
//! - `pylon run`: Discover plugins and keep checking for updates

pub mod commands;

pub use commands::Cli;
