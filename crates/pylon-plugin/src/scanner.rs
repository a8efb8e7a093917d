//! Recursive plugin discovery under a single root directory.
//!
//! Every `plugin.json` found below the root (outside excluded directories)
//! becomes a descriptor in a scan-local map keyed by its directory. Nested
//! plugins are discovered too, so an app can embed its own panels and data
//! sources.

use pylon_core::{PylonError, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::{DirEntry, WalkDir};

use crate::descriptor::{MANIFEST_FILE_NAME, PluginDescriptor, parse_descriptor};
use crate::signature::SignatureVerifier;

/// Directory names never descended into.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "Chromium.app"];

/// A directory to scan and the trust settings that apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    /// Human-readable name used in logs and errors.
    pub label: String,
    pub path: PathBuf,
    /// Whether backend plugins found here must be signed.
    pub require_signing: bool,
    /// Whether plugins found here ship with the host.
    pub core: bool,
}

impl ScanRoot {
    pub fn core(path: impl Into<PathBuf>) -> Self {
        Self {
            label: "core plugins".into(),
            path: path.into(),
            require_signing: false,
            core: true,
        }
    }

    pub fn bundled(path: impl Into<PathBuf>) -> Self {
        Self {
            label: "bundled plugins".into(),
            path: path.into(),
            require_signing: false,
            core: false,
        }
    }

    pub fn external(path: impl Into<PathBuf>) -> Self {
        Self {
            label: "external plugins".into(),
            path: path.into(),
            require_signing: true,
            core: false,
        }
    }

    /// A path configured for one specific plugin.
    pub fn configured(plugin_id: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            label: format!("configured path for plugin '{plugin_id}'"),
            path: path.into(),
            require_signing: true,
            core: false,
        }
    }
}

/// Result of walking one root: discovered descriptors and non-fatal faults.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub plugins: BTreeMap<PathBuf, PluginDescriptor>,
    pub errors: Vec<PylonError>,
}

pub struct Scanner<'a> {
    root: &'a ScanRoot,
    verifier: &'a SignatureVerifier,
}

impl<'a> Scanner<'a> {
    pub fn new(root: &'a ScanRoot, verifier: &'a SignatureVerifier) -> Self {
        Self { root, verifier }
    }

    /// Walk the root. A root that does not exist or cannot be read yields an
    /// empty outcome; any other walk failure aborts the scan. Descriptor
    /// directories are absolute even when the root path is relative.
    pub fn scan(&self) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();
        let base = std::path::absolute(&self.root.path)?;

        let walker = WalkDir::new(&base)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 && is_tolerated_root_error(&e) => {
                    debug!(dir = %self.root.path.display(), error = %e, "couldn't scan plugin directory");
                    return Ok(ScanOutcome::default());
                }
                Err(e) => {
                    warn!(dir = %self.root.path.display(), error = %e, "could not scan plugin directory");
                    return Err(e.into());
                }
            };

            if entry.file_type().is_dir() || entry.file_name() != MANIFEST_FILE_NAME {
                continue;
            }

            match self.load_plugin(entry.path()) {
                Ok(plugin) => {
                    outcome.plugins.insert(plugin.directory.clone(), plugin);
                }
                Err(e) => {
                    error!(
                        error = %e,
                        plugin_dir = %entry.path().parent().unwrap_or(Path::new("")).display(),
                        "failed to load plugin"
                    );
                    outcome.errors.push(e);
                }
            }
        }

        Ok(outcome)
    }

    fn load_plugin(&self, manifest_path: &Path) -> Result<PluginDescriptor> {
        let mut plugin = parse_descriptor(manifest_path)?;

        if plugin.is_core && !self.root.core {
            warn!(id = %plugin.id, dir = %plugin.directory.display(), "ignoring core flag outside the core plugin directory");
        }
        plugin.is_core = self.root.core;

        let state = self.verifier.resolve(&plugin).inspect_err(|e| {
            warn!(id = %plugin.id, error = %e, "could not get plugin signature state");
        })?;
        plugin.signature = state.status;
        plugin.signature_type = state.signature_type;
        plugin.signing_org = state.signing_org;

        Ok(plugin)
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && EXCLUDED_DIRS
            .iter()
            .any(|name| entry.file_name() == std::ffi::OsStr::new(name))
}

fn is_tolerated_root_error(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied))
}
