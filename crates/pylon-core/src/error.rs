use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the Pylon workspace.
#[derive(Error, Debug)]
pub enum PylonError {
    // ── Parse faults ───────────────────────────────────────────
    #[error("malformed plugin manifest {}: {reason}", path.display())]
    MalformedManifest { path: PathBuf, reason: String },

    // ── Registration faults ────────────────────────────────────
    #[error(
        "plugin {id} at {} is a duplicate of the plugin registered from {}",
        duplicate.display(),
        existing.display()
    )]
    DuplicatePlugin {
        id: String,
        existing: PathBuf,
        duplicate: PathBuf,
    },

    // ── Fatal faults ───────────────────────────────────────────
    #[error("unknown plugin type {plugin_type:?} declared by plugin {id}")]
    UnknownPluginType { id: String, plugin_type: String },

    #[error("plugin {id} has unrecognized signature state {state}")]
    UnexpectedSignatureState { id: String, state: String },

    #[error("failed to scan {label} directory {}: {source}", dir.display())]
    ScanFailed {
        label: String,
        dir: PathBuf,
        #[source]
        source: Box<PylonError>,
    },

    // ── Lookup errors ──────────────────────────────────────────
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    // ── Signature errors ───────────────────────────────────────
    #[error("signature error: {0}")]
    Signature(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Update check errors ────────────────────────────────────
    #[error("update check failed: {0}")]
    UpdateCheck(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PylonError>;
