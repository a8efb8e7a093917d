//! Root assignment for nested plugins.
//!
//! A plugin discovered inside another plugin's directory is bound to the
//! **outermost** discovered ancestor, not the nearest one: ancestor paths are
//! rebuilt from the filesystem root inward and the first hit wins. Given
//! `A/`, `A/B/` and `A/B/C/`, both `B` and `C` are rooted at `A`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::descriptor::PluginDescriptor;

/// Find the outermost ancestor of `dir` that is a key of `plugins`.
///
/// `dir` itself is never considered.
pub fn find_root<V>(dir: &Path, plugins: &BTreeMap<PathBuf, V>) -> Option<PathBuf> {
    let parent = dir.parent()?;
    let mut ancestor = PathBuf::new();
    for component in parent.components() {
        ancestor.push(component);
        if plugins.contains_key(&ancestor) {
            return Some(ancestor);
        }
    }
    None
}

/// Assign `root` on every descriptor of a scan-local map.
pub fn resolve_roots(plugins: &mut BTreeMap<PathBuf, PluginDescriptor>) {
    let roots: Vec<(PathBuf, PathBuf)> = plugins
        .keys()
        .filter_map(|dir| find_root(dir, plugins).map(|root| (dir.clone(), root)))
        .collect();

    for (dir, root) in roots {
        if let Some(plugin) = plugins.get_mut(&dir) {
            debug!(id = %plugin.id, root = %root.display(), "found nested plugin");
            plugin.root = Some(root);
        }
    }
}
