//! Frontend module paths and static asset routes.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::descriptor::PluginDescriptor;

/// Serves a plugin's directory under `public/plugins/<plugin_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticRoute {
    pub plugin_id: String,
    pub directory: PathBuf,
}

/// A plugin is external when it lives outside the host's static root.
pub fn is_external(plugin: &PluginDescriptor, static_root: &Path) -> bool {
    !plugin.directory.starts_with(static_root)
}

/// Fill in `module` and `base_url`, returning the static route an external
/// plugin with a frontend needs.
pub fn init_frontend(plugin: &mut PluginDescriptor, static_root: &Path) -> Option<StaticRoute> {
    if is_external(plugin, static_root) {
        plugin.module = format!("plugins/{}/module", plugin.id);
        plugin.base_url = format!("public/plugins/{}", plugin.id);
        if plugin.is_backend_only() {
            return None;
        }
        return Some(StaticRoute {
            plugin_id: plugin.id.clone(),
            directory: plugin.directory.clone(),
        });
    }

    let dir_name = plugin
        .directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    plugin.module = format!("app/plugins/{}/{}/module", plugin.plugin_type, dir_name);
    plugin.base_url = format!("public/app/plugins/{}/{}", plugin.plugin_type, dir_name);
    None
}
