//! # pylon-core
//!
//! Core types and the unified error type shared by every crate in the Pylon
//! workspace.

pub mod error;
pub mod types;

pub use error::{PylonError, Result};
pub use types::*;
